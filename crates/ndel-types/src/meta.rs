use serde::{Deserialize, Serialize};

/// Metadata record kept for every committed object.
///
/// Created exactly once per object and never updated. The serialized field
/// names are part of the HTTP wire format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Client-supplied file name of the uploaded part.
    #[serde(rename = "filename")]
    pub file_name: String,
    /// MIME type sniffed from the stored bytes.
    #[serde(rename = "content-type")]
    pub content_type: String,
    /// Blob length in bytes.
    #[serde(rename = "size")]
    pub length: i64,
    /// Unix timestamp (seconds) of the commit.
    pub created: i64,
}

impl ObjectMeta {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        length: i64,
        created: i64,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            length,
            created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_field_names() {
        let meta = ObjectMeta::new("report.pdf", "application/pdf", 42, 1_700_000_000);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "filename": "report.pdf",
                "content-type": "application/pdf",
                "size": 42,
                "created": 1_700_000_000
            })
        );
    }

    #[test]
    fn bincode_encoding_is_stable() {
        let meta = ObjectMeta::new("a.txt", "text/plain; charset=utf-8", 3, 7);
        let bytes = bincode::serialize(&meta).unwrap();
        let decoded: ObjectMeta = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, meta);
    }
}
