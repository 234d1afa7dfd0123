//! Simulated physician directory for the clinic reference runtime.
//!
//! All data in this module is hardcoded and fictional. It stands in for the
//! `physician-directory` service a real deployment would call.

use serde_json::{json, Value};

// ── Physician directory (mock) ───────────────────────────────────────────────

/// Look up the directory response body for a license.
///
/// Known licenses:
/// - CRM123 → Dr. Helena Prado, email and mobile on file
/// - CRM456 → Dr. Rui Matos, mobile only
/// - CRM789 → Dr. Ana Lobo, email on file but malformed
/// - CRM321 → Dr. Tomás Reis, email on file
///
/// Any other license returns `None`, as the service answers 404.
pub fn directory_response(license: &str) -> Option<Value> {
    let body = match license.trim() {
        "CRM123" => json!({
            "license": "CRM123",
            "name": "Dr. Helena Prado",
            "email": "helena.prado@clinic.example",
            "phone": "+55 11 91234-5678"
        }),
        "CRM456" => json!({
            "license": "CRM456",
            "name": "Dr. Rui Matos",
            "phone": "+55 21 99876-1122"
        }),
        "CRM789" => json!({
            "license": "CRM789",
            "name": "Dr. Ana Lobo",
            "email": "ana.lobo-at-clinic.example"
        }),
        "CRM321" => json!({
            "license": "CRM321",
            "name": "Dr. Tomás Reis",
            "email": "tomas.reis@clinic.example",
            "phone": null
        }),
        _ => return None,
    };
    Some(body)
}

/// Display name the calling application would hold for a license.
///
/// The caller always knows who is logged in, even when the directory does
/// not; for unregistered licenses this returns a generic name.
pub fn display_name(license: &str) -> String {
    directory_response(license)
        .and_then(|body| body["name"].as_str().map(str::to_string))
        .unwrap_or_else(|| "Dr. Unregistered Locum".to_string())
}

// ── Documents (mock) ─────────────────────────────────────────────────────────

/// A prescription awaiting signature.
pub fn prescription(document_id: &str) -> Value {
    json!({
        "document_id": document_id,
        "kind": "prescription",
        "patient": "patient-204",
        "items": [
            { "drug": "amoxicillin", "dose": "500 mg", "frequency": "every 8 hours", "days": 7 },
            { "drug": "ibuprofen", "dose": "400 mg", "frequency": "as needed", "days": 3 }
        ]
    })
}

/// A sick-leave certificate awaiting signature.
pub fn medical_certificate(document_id: &str) -> Value {
    json!({
        "document_id": document_id,
        "kind": "medical-certificate",
        "patient": "patient-311",
        "days_off": 3,
        "cid": "J06.9"
    })
}
