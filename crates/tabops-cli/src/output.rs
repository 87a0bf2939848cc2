// Command output: one JSON document on stdout, errors on stderr

use serde::Serialize;
use serde_json::json;

/// Pretty-print a response body
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => print_error(&format!("Failed to render output: {e}")),
    }
}

/// Failure body in the same shape the HTTP API returns
pub fn failure(message: &str) -> serde_json::Value {
    json!({ "success": false, "message": message })
}

pub fn print_error(message: &str) {
    eprintln!("✗ {message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_shape() {
        let body = failure("Workbook 'Sales' not found");
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Workbook 'Sales' not found");
    }
}
