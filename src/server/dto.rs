use serde::Deserialize;
use serde_json::{Map, Value};

pub type JsonMap = Map<String, Value>;

// Form bodies. Projects and catalogs take urlencoded forms; every field is
// optional so the handlers decide which absences are errors.

#[derive(Debug, Deserialize)]
pub struct ProjectForm {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub estado: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogForm {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PriorityForm {
    pub nombre: Option<String>,
    pub nivel: Option<i64>,
    pub descripcion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectStatusForm {
    pub nombre: Option<String>,
    pub orden: Option<i64>,
    pub descripcion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ElementStatusForm {
    pub nombre: Option<String>,
    pub tipo: Option<String>,
    pub descripcion: Option<String>,
}

// Admin surface (JSON bodies)

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, serde::Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, serde::Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}

/// A field of a JSON body. Update payloads distinguish a key that is missing
/// (leave the column alone) from one that is explicitly `null` (clear it),
/// so plain `Option` loses information.
pub enum Field<'a> {
    Absent,
    Null,
    Value(&'a Value),
}

#[must_use]
pub fn field<'a>(map: &'a JsonMap, key: &str) -> Field<'a> {
    match map.get(key) {
        None => Field::Absent,
        Some(Value::Null) => Field::Null,
        Some(v) => Field::Value(v),
    }
}

/// Ids arrive as JSON integers or as numeric strings.
#[must_use]
pub fn parse_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Numeric values (estimations, business value) with the same tolerance.
#[must_use]
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Actor lists arrive as one string or as a list of strings; lists join
/// with ", ".
#[must_use]
pub fn actors_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_distinguishes_absent_from_null() {
        let map: JsonMap = serde_json::from_value(json!({"a": null, "b": 1})).unwrap();
        assert!(matches!(field(&map, "missing"), Field::Absent));
        assert!(matches!(field(&map, "a"), Field::Null));
        assert!(matches!(field(&map, "b"), Field::Value(_)));
    }

    #[test]
    fn test_parse_id_accepts_numeric_strings() {
        assert_eq!(parse_id(&json!(7)), Some(7));
        assert_eq!(parse_id(&json!("7")), Some(7));
        assert_eq!(parse_id(&json!(" 7 ")), Some(7));
        assert_eq!(parse_id(&json!("siete")), None);
        assert_eq!(parse_id(&json!([7])), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(&json!(2.5)), Some(2.5));
        assert_eq!(parse_number(&json!("2.5")), Some(2.5));
        assert_eq!(parse_number(&json!("x")), None);
    }

    #[test]
    fn test_actors_text_joins_lists() {
        assert_eq!(
            actors_text(&json!(["Cliente", "Vendedor"])).as_deref(),
            Some("Cliente, Vendedor")
        );
        assert_eq!(actors_text(&json!("Cliente")).as_deref(), Some("Cliente"));
        assert_eq!(actors_text(&json!(42)), None);
    }
}
