use truckflow_importer::core::sanitizer::{parse_plates, FieldSanitizer, MAX_PLATE_LEN};
use truckflow_importer::domain::model::{SanitizedTransaction, WebhookPayload};

fn webhook_json(status: &str, quantity: u32, plates: &str) -> String {
    serde_json::json!({
        "transaction": {
            "uuid": "b63112e9",
            "time": "2025-01-27 22:08:58",
            "status": status,
            "invoice": {
                "products": [{
                    "name": "Badge Ajoverts",
                    "description": "SomeProductDescription",
                    "price": 2000,
                    "quantity": quantity,
                    "sku": null,
                    "vatRate": null
                }],
                "custom_fields": [
                    {"type": "text", "name": "Numéro client (optionnel)", "value": "00014"},
                    {"type": "text", "name": "Numéros de plaques (séparés par des virgules)", "value": plates}
                ]
            },
            "contact": {
                "title": "mister",
                "firstname": "Foo",
                "lastname": "Bar",
                "company": "",
                "street": "NotFar 2",
                "zip": "12345",
                "place": "Away",
                "country": "Suisse",
                "countryISO": "CH",
                "phone": "+41123456789",
                "email": "some@email.ch"
            }
        }
    })
    .to_string()
}

fn sanitize(quantity: u32, plates: &str) -> SanitizedTransaction {
    let payload: WebhookPayload =
        serde_json::from_str(&webhook_json("cancelled", quantity, plates)).unwrap();
    FieldSanitizer::new("Badge Ajoverts")
        .sanitize(payload.transaction)
        .unwrap()
}

#[test]
fn test_correct_webhook_parsing() {
    let tx = sanitize(2, "JU12345, Ju54321");

    assert_eq!(tx.plates, vec!["JU12345", "JU54321"]);
    assert_eq!(tx.transaction.contact.email, "some@email.ch");
    assert_eq!(tx.transaction.invoice.products[0].quantity, 2);
    assert!(!tx.is_confirmed());
}

#[test]
fn test_multi_plate() {
    let tx = sanitize(2, "JU12345, Ju2,  ju3,; ju4!,");
    assert_eq!(tx.plates, vec!["JU12345", "JU2.JU3.JU4"]);
}

#[test]
fn test_long_last_plate() {
    let tx = sanitize(1, "JU12345,JU12345,JU12345,JU12345");

    assert_eq!(tx.plates, vec!["JU12345.JU12345.JU12345.JU1..."]);
    assert_eq!(tx.plates[0].len(), 30);
}

#[test]
fn test_exact_count_keeps_order() {
    let tokens = ["GE1", "VD22", "NE333", "JU4444", "FR5"];
    for q in 1..=tokens.len() {
        let raw = tokens[..q].join(", ");
        let (plates, _) = parse_plates(&raw, q);
        assert_eq!(plates, tokens[..q].to_vec(), "quantity {}", q);
    }
}

#[test]
fn test_overflow_law() {
    let tokens = ["AA1", "BB22", "CC333", "DD4444", "EE55555", "FF666666", "GG7777777"];
    for q in 1..tokens.len() {
        let raw = tokens.join(",");
        let (plates, _) = parse_plates(&raw, q);

        assert_eq!(plates.len(), q);
        assert_eq!(&plates[..q - 1], &tokens[..q - 1]);

        let joined = tokens[q - 1..].join(".");
        let expected = if joined.len() > MAX_PLATE_LEN {
            format!("{}...", &joined[..27])
        } else {
            joined
        };
        assert_eq!(plates[q - 1], expected, "quantity {}", q);
        assert!(plates[q - 1].len() <= MAX_PLATE_LEN);
    }
}

#[test]
fn test_underflow_law() {
    let (plates, _) = parse_plates("AA1,BB2", 5);
    assert_eq!(plates, vec!["AA1", "BB2", "N/D", "N/D", "N/D"]);
}

#[test]
fn test_wrong_product_rejected() {
    let json = webhook_json("confirmed", 1, "JU1").replace("Badge Ajoverts", "Carte cadeau");
    let payload: WebhookPayload = serde_json::from_str(&json).unwrap();

    assert!(FieldSanitizer::new("Badge Ajoverts")
        .sanitize(payload.transaction)
        .is_err());
}
