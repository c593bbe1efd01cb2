use serde::Deserialize;

use super::*;

#[derive(Debug, Deserialize)]
struct Probe {
    #[serde(default, deserialize_with = "lenient_f64")]
    price: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    total: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u32")]
    capacity: u32,
    #[serde(default, deserialize_with = "string_list")]
    images: Vec<String>,
}

fn probe(value: serde_json::Value) -> Result<Probe, serde_json::Error> {
    serde_json::from_value(value)
}

#[test]
fn numbers_accept_strings() {
    let p = probe(serde_json::json!({ "price": "12.50", "total": "100", "capacity": "8" })).unwrap();
    assert!((p.price - 12.5).abs() < f64::EPSILON);
    assert_eq!(p.total, Some(100.0));
    assert_eq!(p.capacity, 8);
}

#[test]
fn numbers_accept_numbers() {
    let p = probe(serde_json::json!({ "price": 9, "capacity": 4.0 })).unwrap();
    assert!((p.price - 9.0).abs() < f64::EPSILON);
    assert_eq!(p.capacity, 4);
    assert_eq!(p.total, None);
}

#[test]
fn null_total_is_none() {
    let p = probe(serde_json::json!({ "total": null })).unwrap();
    assert_eq!(p.total, None);
}

#[test]
fn fractional_capacity_is_rejected() {
    assert!(probe(serde_json::json!({ "capacity": 2.5 })).is_err());
    assert!(probe(serde_json::json!({ "capacity": -1 })).is_err());
}

#[test]
fn garbage_price_is_rejected() {
    let err = probe(serde_json::json!({ "price": "cheap" })).unwrap_err().to_string();
    assert!(err.contains("expected a number"));
}

#[test]
fn images_accept_string_list_or_null() {
    assert_eq!(probe(serde_json::json!({ "images": "a.jpg" })).unwrap().images, vec!["a.jpg"]);
    assert_eq!(probe(serde_json::json!({ "images": ["a.jpg", "", "b.jpg"] })).unwrap().images, vec!["a.jpg", "b.jpg"]);
    assert!(probe(serde_json::json!({ "images": null })).unwrap().images.is_empty());
    assert!(probe(serde_json::json!({ "images": "" })).unwrap().images.is_empty());
}

#[test]
fn one_or_many_wraps_single_object() {
    let one: OneOrMany<serde_json::Value> = serde_json::from_value(serde_json::json!({ "id": 1 })).unwrap();
    assert_eq!(one.into_vec().len(), 1);
    let many: OneOrMany<serde_json::Value> = serde_json::from_value(serde_json::json!([{ "id": 1 }, { "id": 2 }])).unwrap();
    assert_eq!(many.into_vec().len(), 2);
}
