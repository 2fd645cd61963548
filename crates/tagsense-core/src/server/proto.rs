//! Wire messages of `tag_suggestion.v1`.
//!
//! ```proto
//! message SuggestRequest  { repeated string image_urls = 1; }
//! message Suggestion      { string image_url = 1; repeated double scores = 2;
//!                           repeated int64 sorted_score_indices = 3; }
//! message Tag             { int64 id = 1; string name = 2; string full_name = 3; }
//! message SuggestResponse { repeated Suggestion suggestions = 1;
//!                           map<int64, string> all_tags = 2;
//!                           map<int64, Tag> tags = 3; }
//! service TagSuggestionService {
//!   rpc Suggest(SuggestRequest) returns (SuggestResponse);
//! }
//! ```

use std::collections::HashMap;

use serde::Serialize;

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct SuggestRequest {
    #[prost(string, repeated, tag = "1")]
    pub image_urls: Vec<String>,
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct Suggestion {
    #[prost(string, tag = "1")]
    pub image_url: String,
    #[prost(double, repeated, tag = "2")]
    pub scores: Vec<f64>,
    #[prost(int64, repeated, tag = "3")]
    pub sorted_score_indices: Vec<i64>,
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct Tag {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub full_name: String,
}

#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct SuggestResponse {
    #[prost(message, repeated, tag = "1")]
    pub suggestions: Vec<Suggestion>,
    #[prost(map = "int64, string", tag = "2")]
    pub all_tags: HashMap<i64, String>,
    /// Only filled when the model ships a tag tree.
    #[prost(map = "int64, message", tag = "3")]
    pub tags: HashMap<i64, Tag>,
}

include!(concat!(
    env!("OUT_DIR"),
    "/tag_suggestion.v1.TagSuggestionService.rs"
));

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_request_wire_format() {
        let request = SuggestRequest {
            image_urls: vec!["a".to_string()],
        };
        // field 1, wire type 2, length 1, "a"
        assert_eq!(request.encode_to_vec(), vec![0x0A, 0x01, b'a']);
    }

    #[test]
    fn test_response_decodes_maps() {
        let mut response = SuggestResponse::default();
        response.all_tags.insert(0, String::new());
        response.all_tags.insert(2, "dog".to_string());
        response.suggestions.push(Suggestion {
            image_url: "x.jpg".to_string(),
            scores: vec![0.25, 0.5, 0.75],
            sorted_score_indices: vec![2, 1, 0],
        });

        let decoded = SuggestResponse::decode(response.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, response);
        assert!(decoded.tags.is_empty());
    }
}
