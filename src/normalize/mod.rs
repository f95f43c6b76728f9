//! Response normalization
//!
//! The backend's JSON is loosely typed and its field spellings vary between
//! deployments (`latitude` vs `lat`, `checkpoints` vs `waypoints`, ...).
//! This module maps raw `serde_json::Value` payloads into the canonical
//! model. Each field is resolved through an ordered list of candidate paths
//! applied first-match; records missing a required field are dropped, and
//! collections filter out bad elements instead of failing whole.
//!
//! Nothing here returns an error: a value either normalizes or it doesn't.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::models::{CheckIn, Checkpoint, Route, User};

/// Resolve a dotted path (`"route.id"`) inside a JSON value
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

/// First non-null value among the candidate paths
fn first_match<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| lookup(value, path))
        .find(|candidate| !candidate.is_null())
}

/// Coerce a JSON scalar to a string. Numbers are accepted because ids often
/// arrive numeric; objects, arrays and booleans are not.
fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a JSON scalar to a number, accepting numeric strings
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_field(value: &Value, paths: &[&str]) -> Option<String> {
    first_match(value, paths).and_then(as_string)
}

fn number_field(value: &Value, paths: &[&str]) -> Option<f64> {
    first_match(value, paths).and_then(as_number)
}

/// A non-empty string identifier resolved from the candidate paths
fn id_field(value: &Value, paths: &[&str]) -> Option<String> {
    string_field(value, paths).filter(|id| !id.is_empty())
}

/// Parse a backend timestamp. Accepts RFC 3339, a naive datetime taken as
/// UTC (the backend serializes `LocalDateTime` without an offset), and
/// integer epoch milliseconds.
pub fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            DateTime::parse_from_rfc3339(trimmed)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|naive| Utc.from_utc_datetime(&naive))
                })
                .or_else(|| {
                    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
                        .ok()
                        .map(|naive| Utc.from_utc_datetime(&naive))
                })
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Normalize one checkpoint. `index` is the element's position in the
/// surrounding array and doubles as the fallback id. A non-numeric
/// coordinate drops the checkpoint.
pub fn checkpoint(value: &Value, index: usize) -> Option<Checkpoint> {
    if !value.is_object() {
        return None;
    }

    let latitude = number_field(value, &["latitude", "lat"])?;
    let longitude = number_field(value, &["longitude", "lng", "lon"])?;
    let id = id_field(value, &["id", "checkpointId"]).unwrap_or_else(|| index.to_string());

    Some(Checkpoint {
        id,
        latitude,
        longitude,
    })
}

/// Normalize one route. A record without a resolvable id is rejected;
/// missing descriptive fields fall back to literal defaults.
pub fn route(value: &Value) -> Option<Route> {
    if !value.is_object() {
        return None;
    }

    let id = id_field(value, &["id", "routeId", "uuid"])?;
    let name = string_field(value, &["name", "title"]).unwrap_or_else(|| "Route".to_string());
    let description = string_field(value, &["description", "details"]).unwrap_or_default();
    let distance_km = number_field(value, &["distanceKm", "distance"]).unwrap_or(0.0);

    let checkpoints = first_match(value, &["checkpoints", "checkPoints", "waypoints"])
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| checkpoint(item, index))
                .collect()
        })
        .unwrap_or_default();

    Some(Route {
        id,
        name,
        description,
        distance_km,
        checkpoints,
    })
}

/// Normalize a route collection. `None` when the payload is not an array.
pub fn routes(value: &Value) -> Option<Vec<Route>> {
    let items = value.as_array()?;
    Some(items.iter().filter_map(route).collect())
}

/// Normalize one check-in. All of id, route, username and a parseable
/// timestamp are required; the checkpoint id is optional.
pub fn check_in(value: &Value) -> Option<CheckIn> {
    if !value.is_object() {
        return None;
    }

    let id = id_field(value, &["id", "checkInId", "uuid"])?;
    let route_id = id_field(value, &["routeId", "route.id"])?;
    let checkpoint_id = id_field(value, &["checkpointId", "checkpoint.id"]);
    let username = string_field(value, &["username", "user.username", "user"])
        .filter(|name| !name.is_empty())?;
    let checked_at = first_match(value, &["checkedAt", "timestamp", "createdAt"])
        .and_then(timestamp)?;

    Some(CheckIn {
        id,
        route_id,
        checkpoint_id,
        username,
        checked_at,
    })
}

/// Normalize a check-in collection. `None` when the payload is not an array.
pub fn check_ins(value: &Value) -> Option<Vec<CheckIn>> {
    let items = value.as_array()?;
    Some(items.iter().filter_map(check_in).collect())
}

/// Extract a bearer token from an auth response.
///
/// Priority: payload-level `token`/`accessToken`, then `data.token`, then
/// `user.token`. If none resolves, a non-empty raw body is taken as an
/// opaque token (the backend's login endpoint replies with the bare token
/// as plain text).
pub fn token(payload: Option<&Value>, raw: &str) -> Option<String> {
    if let Some(value) = payload {
        let extracted =
            string_field(value, &["token", "accessToken", "data.token", "user.token"])
                .filter(|token| !token.is_empty());
        if extracted.is_some() {
            return extracted;
        }
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Build a `User` from an auth response. `username` is the credential the
/// caller submitted, used as the fallback for missing identity fields.
/// Without a resolvable token there is no user.
pub fn user(payload: Option<&Value>, raw: &str, username: &str) -> Option<User> {
    let token = token(payload, raw)?;
    let value = payload.unwrap_or(&Value::Null);

    let id = number_field(value, &["id", "userId", "user.id"]).unwrap_or(0.0) as i64;
    let email =
        string_field(value, &["email", "user.email"]).unwrap_or_else(|| username.to_string());
    let display_name = string_field(
        value,
        &[
            "displayName",
            "name",
            "username",
            "user.displayName",
            "user.username",
        ],
    )
    .unwrap_or_else(|| email.clone());

    Some(User {
        id,
        email,
        display_name,
        token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route_with_canonical_keys() {
        let payload = json!({
            "id": "r1",
            "name": "City Explorer",
            "description": "Downtown loop",
            "distanceKm": 3.5,
            "checkpoints": [
                {"id": "c1", "latitude": -36.8485, "longitude": 174.7633},
                {"id": "c2", "latitude": -36.85, "longitude": 174.765}
            ]
        });

        let route = route(&payload).expect("route should normalize");
        assert_eq!(route.id, "r1");
        assert_eq!(route.name, "City Explorer");
        assert_eq!(route.distance_km, 3.5);
        assert_eq!(route.checkpoints.len(), 2);
        assert_eq!(route.checkpoints[0].id, "c1");
    }

    #[test]
    fn test_alternate_coordinate_keys_match_canonical() {
        let canonical = json!({
            "id": "r1",
            "checkpoints": [{"id": "c1", "latitude": 1.5, "longitude": 2.5}]
        });
        let alternate = json!({
            "routeId": "r1",
            "waypoints": [{"id": "c1", "lat": 1.5, "lng": 2.5}]
        });

        assert_eq!(route(&canonical), route(&alternate));
    }

    #[test]
    fn test_route_defaults_for_missing_fields() {
        let route = route(&json!({"uuid": 42})).expect("id alone is enough");
        assert_eq!(route.id, "42");
        assert_eq!(route.name, "Route");
        assert_eq!(route.description, "");
        assert_eq!(route.distance_km, 0.0);
        assert!(route.checkpoints.is_empty());
    }

    #[test]
    fn test_route_without_id_is_rejected() {
        assert_eq!(route(&json!({"name": "Nameless"})), None);
        assert_eq!(route(&json!("r1")), None);
        assert_eq!(route(&Value::Null), None);
    }

    #[test]
    fn test_bad_coordinate_drops_checkpoint_not_route() {
        let payload = json!({
            "id": "r1",
            "checkpoints": [
                {"id": "c1", "latitude": "nope", "longitude": 2.0},
                {"id": "c2", "latitude": "3.25", "longitude": 4.0}
            ]
        });

        let route = route(&payload).unwrap();
        assert_eq!(route.checkpoints.len(), 1);
        assert_eq!(route.checkpoints[0].id, "c2");
        assert_eq!(route.checkpoints[0].latitude, 3.25);
    }

    #[test]
    fn test_checkpoint_index_fallback_id() {
        let cp = checkpoint(&json!({"latitude": 1.0, "longitude": 2.0}), 3).unwrap();
        assert_eq!(cp.id, "3");
    }

    #[test]
    fn test_routes_filters_bad_elements() {
        let payload = json!([
            {"id": "r1"},
            {"name": "no id"},
            42,
            {"routeId": "r2"}
        ]);

        let routes = routes(&payload).unwrap();
        assert_eq!(
            routes.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["r1", "r2"]
        );
        assert_eq!(super::routes(&json!({"routes": []})), None);
    }

    #[test]
    fn test_check_in_canonical_and_nested_shapes() {
        let canonical = json!({
            "id": 10,
            "routeId": 5,
            "checkpointId": 2,
            "username": "alice",
            "checkedAt": "2024-06-01T10:00:00"
        });
        let nested = json!({
            "checkInId": 10,
            "route": {"id": 5},
            "checkpoint": {"id": 2},
            "user": {"username": "alice"},
            "timestamp": "2024-06-01T10:00:00Z"
        });

        let a = check_in(&canonical).expect("canonical shape");
        let b = check_in(&nested).expect("nested shape");
        assert_eq!(a, b);
        assert_eq!(a.id, "10");
        assert_eq!(a.route_id, "5");
        assert_eq!(a.checkpoint_id, Some("2".to_string()));
    }

    #[test]
    fn test_check_in_without_checkpoint_is_kept() {
        let payload = json!({
            "id": 1,
            "routeId": 1,
            "username": "alice",
            "checkedAt": "2024-06-01T10:00:00"
        });
        assert_eq!(check_in(&payload).unwrap().checkpoint_id, None);
    }

    #[test]
    fn test_check_in_missing_required_field_is_rejected() {
        let base = json!({
            "id": 1,
            "routeId": 1,
            "username": "alice",
            "checkedAt": "2024-06-01T10:00:00"
        });

        for field in ["id", "routeId", "username", "checkedAt"] {
            let mut broken = base.clone();
            broken.as_object_mut().unwrap().remove(field);
            assert_eq!(check_in(&broken), None, "missing {field}");
        }
    }

    #[test]
    fn test_check_in_unparseable_timestamp_is_rejected() {
        let payload = json!({
            "id": 1,
            "routeId": 1,
            "username": "alice",
            "checkedAt": "yesterday-ish"
        });
        assert_eq!(check_in(&payload), None);
    }

    #[test]
    fn test_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(timestamp(&json!("2024-06-01T10:00:00Z")), Some(expected));
        assert_eq!(timestamp(&json!("2024-06-01T10:00:00")), Some(expected));
        assert_eq!(timestamp(&json!("2024-06-01 10:00:00")), Some(expected));
        assert_eq!(
            timestamp(&json!(expected.timestamp_millis())),
            Some(expected)
        );
        assert_eq!(timestamp(&json!(true)), None);
    }

    #[test]
    fn test_token_priority_order() {
        let payload = json!({
            "token": "top",
            "data": {"token": "data"},
            "user": {"token": "user"}
        });
        assert_eq!(token(Some(&payload), "raw"), Some("top".to_string()));

        let payload = json!({"data": {"token": "data"}, "user": {"token": "user"}});
        assert_eq!(token(Some(&payload), "raw"), Some("data".to_string()));

        let payload = json!({"user": {"token": "user"}});
        assert_eq!(token(Some(&payload), "raw"), Some("user".to_string()));
    }

    #[test]
    fn test_token_raw_body_fallback() {
        assert_eq!(
            token(Some(&json!({"ok": true})), "opaque-jwt\n"),
            Some("opaque-jwt".to_string())
        );
        assert_eq!(token(None, "  "), None);
    }

    #[test]
    fn test_user_from_structured_payload() {
        let payload = json!({
            "id": 7,
            "email": "alice@example.com",
            "displayName": "Alice",
            "token": "tok"
        });

        let user = user(Some(&payload), "", "alice@example.com").unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.display_name, "Alice");
        assert_eq!(user.token, "tok");
    }

    #[test]
    fn test_user_from_bare_token_body() {
        let user = user(None, "jwt-abc", "alice@example.com").unwrap();
        assert_eq!(user.id, 0);
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.display_name, "alice@example.com");
        assert_eq!(user.token, "jwt-abc");
    }

    #[test]
    fn test_user_without_token_is_rejected() {
        assert_eq!(user(Some(&json!({"id": 7})), "", "alice"), None);
    }
}
