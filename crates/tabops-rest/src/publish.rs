//! `multipart/mixed` body for workbook publishing

use quick_xml::escape::escape;
use uuid::Uuid;

/// Request body plus the boundary its content type must announce
pub struct MultipartBody {
    pub boundary: String,
    pub bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }
}

/// Build the two-part publish request: XML payload, then the package file
pub fn workbook_body(name: &str, project_id: &str, filename: &str, package: &[u8]) -> MultipartBody {
    let boundary = Uuid::new_v4().simple().to_string();
    let payload = format!(
        "<tsRequest><workbook name=\"{}\" showTabs=\"false\"><project id=\"{}\"/></workbook></tsRequest>",
        escape(name),
        escape(project_id),
    );

    let mut bytes = Vec::with_capacity(package.len() + payload.len() + 512);
    bytes.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: name=\"request_payload\"\r\nContent-Type: text/xml\r\n\r\n{payload}\r\n"
        )
        .as_bytes(),
    );
    bytes.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: name=\"tableau_workbook\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            filename.replace('"', "")
        )
        .as_bytes(),
    );
    bytes.extend_from_slice(package);
    bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    MultipartBody { boundary, bytes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_layout() {
        let body = workbook_body("Q1 & Q2", "p-1", "Q1.twbx", b"PK\x03\x04data");
        let text = String::from_utf8_lossy(&body.bytes);

        assert!(body.content_type().starts_with("multipart/mixed; boundary="));
        assert!(text.contains("name=\"request_payload\""));
        assert!(text.contains("<workbook name=\"Q1 &amp; Q2\" showTabs=\"false\"><project id=\"p-1\"/>"));
        assert!(text.contains("filename=\"Q1.twbx\""));
        assert!(text.ends_with(&format!("--{}--\r\n", body.boundary)));
    }
}
