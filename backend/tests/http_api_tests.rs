//! End-to-end tests of the REST API against the in-memory repository.

#![cfg(feature = "http-server")]

mod support;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use clinic_booking::http::{create_router, AppState};
use support::{seed, Seed};

fn app(seed: &Seed) -> Router {
    create_router(AppState::from_service(seed.service()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn appointment_body(seed: &Seed, start: &str) -> Value {
    json!({
        "appointmentDateTime": start,
        "category": "Checkup",
        "patientId": seed.patient.id.value(),
        "doctorId": seed.doctor.id.value(),
        "clinicId": seed.clinic.id.value(),
        "durationInMinutes": 30
    })
}

#[tokio::test]
async fn test_health() {
    let seed = seed().await;
    let (status, body) = send(app(&seed), empty_request("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_create_get_list_delete() {
    let seed = seed().await;
    let app = app(&seed);

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/v1/appointments",
            appointment_body(&seed, "2031-03-10T09:00:00"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let appointment = &body["appointment"];
    assert_eq!(appointment["doctorName"], "John Smith");
    assert_eq!(appointment["patientName"], "Jane Doe");
    assert_eq!(appointment["clinicName"], "Riverside Clinic");
    assert_eq!(appointment["durationInMinutes"], 30);
    let id = appointment["id"].as_i64().unwrap();

    let (status, body) = send(
        app.clone(),
        empty_request("GET", &format!("/v1/appointments/{}", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["appointmentDateTime"], "2031-03-10T09:00:00");

    let (status, body) = send(app.clone(), empty_request("GET", "/v1/appointments")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointments"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        app.clone(),
        empty_request("DELETE", &format!("/v1/appointments/{}", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Appointment deleted successfully.");

    let (status, body) = send(
        app,
        empty_request("GET", &format!("/v1/appointments/{}", id)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["message"], "Appointment not found.");
}

#[tokio::test]
async fn test_conflict_is_409() {
    let seed = seed().await;
    let app = app(&seed);
    let body = appointment_body(&seed, "2031-03-10T10:00:00");

    let (status, _) = send(app.clone(), json_request("POST", "/v1/appointments", body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut overlapping = appointment_body(&seed, "2031-03-10T10:15:00");
    overlapping["patientId"] = json!(seed.other_patient.id.value());
    let (status, body) = send(app, json_request("POST", "/v1/appointments", overlapping)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT_ERROR");
    assert_eq!(body["message"], "Doctor is already booked at this time.");
}

#[tokio::test]
async fn test_rule_violations_are_400() {
    let seed = seed().await;
    let app = app(&seed);

    let mut blank = appointment_body(&seed, "2031-03-10T09:00:00");
    blank["category"] = json!("");
    let (status, body) = send(app.clone(), json_request("POST", "/v1/appointments", blank)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "Category is required.");

    let mut unknown = appointment_body(&seed, "2031-03-10T09:00:00");
    unknown["doctorId"] = json!(9999);
    let (status, body) = send(app.clone(), json_request("POST", "/v1/appointments", unknown)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "REFERENTIAL_INTEGRITY_ERROR");
    assert_eq!(body["message"], "Doctor ID does not exist.");

    let late = appointment_body(&seed, "2031-03-10T18:01:00");
    let (status, body) = send(app, json_request("POST", "/v1/appointments", late)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TEMPORAL_ERROR");
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let seed = seed().await;
    let request = Request::builder()
        .method("POST")
        .uri("/v1/appointments")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(&seed), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_update_returns_message_and_view() {
    let seed = seed().await;
    let app = app(&seed);
    let (_, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/v1/appointments",
            appointment_body(&seed, "2031-03-10T09:00:00"),
        ),
    )
    .await;
    let id = body["appointment"]["id"].as_i64().unwrap();

    let mut moved = appointment_body(&seed, "2031-03-10T09:15:00");
    moved["durationInMinutes"] = json!(45);
    let (status, body) = send(
        app,
        json_request("PUT", &format!("/v1/appointments/{}", id), moved),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Appointment updated successfully.");
    assert_eq!(body["appointment"]["durationInMinutes"], 45);
}

#[tokio::test]
async fn test_with_patient_creates_and_reuses() {
    let seed = seed().await;
    let app = app(&seed);
    let payload = |start: &str| {
        json!({
            "patient": {
                "firstName": "Nora",
                "lastName": "Vance",
                "email": "nora@example.com",
                "birthDate": "1990-04-01",
                "gender": "Female"
            },
            "appointment": {
                "appointmentDateTime": start,
                "category": "Consultation",
                "doctorId": seed.doctor.id.value(),
                "clinicId": seed.clinic.id.value(),
                "durationInMinutes": 20
            }
        })
    };

    let (status, first) = send(
        app.clone(),
        json_request(
            "POST",
            "/v1/appointments/with-patient",
            payload("2031-03-10T09:00:00"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, second) = send(
        app,
        json_request(
            "POST",
            "/v1/appointments/with-patient",
            payload("2031-03-10T13:00:00"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        first["appointment"]["patientId"],
        second["appointment"]["patientId"]
    );
    assert_eq!(seed.repo.patient_count(), 3);
}

#[tokio::test]
async fn test_search_doctors() {
    let seed = seed().await;
    let app = app(&seed);

    let (status, body) = send(
        app.clone(),
        json_request("POST", "/v1/search/doctors", json!({ "lastName": "SMI" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let doctors = body["results"].as_array().unwrap();
    assert_eq!(doctors.len(), 1);
    assert_eq!(doctors[0]["fullName"], "John Smith");
    assert_eq!(doctors[0]["specialityName"], "General Practice");

    let (status, body) = send(
        app.clone(),
        json_request("POST", "/v1/search/doctors", json!({ "firstName": "Zed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["results"].as_array().unwrap().is_empty());

    let (status, body) = send(
        app,
        json_request("POST", "/v1/search/doctors", json!({ "firstName": " " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Please provide at least a first name or last name to search."
    );
}

#[tokio::test]
async fn test_reference_data_creation() {
    let seed = seed().await;
    let app = app(&seed);

    let (status, clinic) = send(
        app.clone(),
        json_request("POST", "/v1/clinics", json!({ "name": "Hillside" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, speciality) = send(
        app.clone(),
        json_request("POST", "/v1/specialities", json!({ "name": "Dermatology" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, doctor) = send(
        app.clone(),
        json_request(
            "POST",
            "/v1/doctors",
            json!({
                "firstName": "Rita",
                "lastName": "Moreno",
                "clinicId": clinic["id"],
                "specialityId": speciality["id"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(doctor["lastName"], "Moreno");

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/v1/doctors",
            json!({
                "firstName": "Ghost",
                "lastName": "Doctor",
                "clinicId": 9999,
                "specialityId": speciality["id"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "REFERENTIAL_INTEGRITY_ERROR");
    assert_eq!(body["message"], "Clinic 9999 does not exist.");

    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/v1/patients",
            json!({ "firstName": "", "lastName": "X", "email": "x@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Patient info is required.");
}

#[tokio::test]
async fn test_reference_data_lookup() {
    let seed = seed().await;
    let app = app(&seed);

    let (status, clinic) = send(
        app.clone(),
        empty_request("GET", &format!("/v1/clinics/{}", seed.clinic.id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clinic["name"], "Riverside Clinic");
    assert_eq!(clinic["address"], "12 River Rd");

    let (status, doctor) = send(
        app.clone(),
        empty_request("GET", &format!("/v1/doctors/{}", seed.doctor.id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doctor["firstName"], "John");
    assert_eq!(doctor["clinicId"], seed.clinic.id.value());

    let (status, speciality) = send(
        app.clone(),
        empty_request(
            "GET",
            &format!("/v1/specialities/{}", seed.doctor.speciality_id),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(speciality["name"], "General Practice");

    let (status, patient) = send(
        app.clone(),
        empty_request("GET", &format!("/v1/patients/{}", seed.other_patient.id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patient["email"], "mark@example.com");

    for (uri, count) in [
        ("/v1/clinics", 1),
        ("/v1/specialities", 2),
        ("/v1/doctors", 2),
        ("/v1/patients", 2),
    ] {
        let (status, body) = send(app.clone(), empty_request("GET", uri)).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body.as_array().unwrap().len(), count, "{}", uri);
    }

    let (status, body) = send(app.clone(), empty_request("GET", "/v1/doctors/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["message"], "Doctor not found.");

    let (status, body) = send(app, empty_request("GET", "/v1/patients/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Patient not found.");
}

#[tokio::test]
async fn test_timeout_header() {
    let seed = seed().await;
    let app = app(&seed);

    let mut request = json_request(
        "POST",
        "/v1/appointments",
        appointment_body(&seed, "2031-03-10T09:00:00"),
    );
    request
        .headers_mut()
        .insert("x-request-timeout-ms", "abc".parse().unwrap());
    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let mut request = json_request(
        "POST",
        "/v1/appointments",
        appointment_body(&seed, "2031-03-10T09:00:00"),
    );
    request
        .headers_mut()
        .insert("x-request-timeout-ms", "2000".parse().unwrap());
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::CREATED);
}
