//! Generates the `tag_suggestion.v1.TagSuggestionService` client and server.
//!
//! Messages are hand-written prost structs in `src/server/proto.rs`, so only the
//! service plumbing is generated here and no `protoc` is needed at build time.

fn main() {
    let suggest = tonic_build::manual::Method::builder()
        .name("suggest")
        .route_name("Suggest")
        .input_type("crate::server::proto::SuggestRequest")
        .output_type("crate::server::proto::SuggestResponse")
        .codec_path("tonic::codec::ProstCodec")
        .build();

    let service = tonic_build::manual::Service::builder()
        .name("TagSuggestionService")
        .package("tag_suggestion.v1")
        .method(suggest)
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);
}
