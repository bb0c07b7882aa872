/// Tests for API payload conventions
///
/// Note: These are unit tests that verify the wire formats are correct.
/// Integration tests would require a running server.

#[cfg(test)]
mod tests {
    use serde_json::json;

    // Status values travel as snake_case strings
    #[test]
    fn test_status_wire_format() {
        let statuses = [
            "pending",
            "shortlisted",
            "for_interview",
            "interviewed",
            "approved",
            "deployed",
            "completed",
            "rejected",
            "withdrawn",
        ];

        for status in statuses {
            let body = json!({ "status": status });
            assert_eq!(body["status"], status);
            assert!(!status.contains(char::is_uppercase));
        }
    }

    // Request bodies use camelCase keys
    #[test]
    fn test_request_key_casing() {
        let submit = json!({
            "course": "BS Computer Science",
            "yearLevel": 2,
            "gradeFile": "abc.pdf",
            "signatureFile": "sig.png"
        });

        assert!(submit.get("yearLevel").is_some());
        assert!(submit.get("year_level").is_none());

        let leave = json!({
            "applicationId": "id-1",
            "dateFrom": "2026-01-05",
            "dateTo": "2026-01-07",
            "reason": "medical"
        });

        assert!(leave.get("applicationId").is_some());
    }

    // Leave date ranges parse as ISO dates and order correctly
    #[test]
    fn test_leave_date_ordering() {
        use chrono::NaiveDate;

        let from: NaiveDate = "2026-01-05".parse().unwrap();
        let to: NaiveDate = "2026-01-07".parse().unwrap();

        assert!(to >= from);

        let bad_to: NaiveDate = "2026-01-04".parse().unwrap();
        assert!(bad_to < from);
    }

    // Permission bitsets compose with bitwise OR
    #[test]
    fn test_permission_composition() {
        const MANAGE_TRAINEES: i64 = 1 << 0;
        const REVIEW_DTR: i64 = 1 << 1;
        const APPROVE_LEAVE: i64 = 1 << 2;

        let granted = MANAGE_TRAINEES | APPROVE_LEAVE;

        assert_eq!(granted & MANAGE_TRAINEES, MANAGE_TRAINEES);
        assert_eq!(granted & APPROVE_LEAVE, APPROVE_LEAVE);
        assert_ne!(granted & REVIEW_DTR, REVIEW_DTR);
    }

    // Error responses carry error and message fields
    #[test]
    fn test_error_shape() {
        let body = json!({
            "error": "AuthenticationFailed",
            "message": "Invalid credentials"
        });

        assert!(body["error"].is_string());
        assert!(body["message"].is_string());
    }
}
