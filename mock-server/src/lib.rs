use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 5;

/// Largest price the `max_digits=6, decimal_places=2` column can hold.
const MAX_PRICE_CENTS: i64 = 999_999;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: i64,
    pub segment_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: i64,
    pub brand_name: String,
}

/// A vehicle as served, with the segment and brand names joined in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub vehicle_name: String,
    pub release_year: i32,
    pub price: Decimal,
    pub segment: i64,
    pub brand: i64,
    pub segment_name: String,
    pub brand_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub username: String,
}

#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct SegmentInput {
    pub segment_name: String,
}

#[derive(Deserialize)]
pub struct BrandInput {
    pub brand_name: String,
}

#[derive(Deserialize)]
pub struct VehicleInput {
    pub vehicle_name: String,
    pub release_year: i32,
    pub price: Decimal,
    pub segment: i64,
    pub brand: i64,
}

struct User {
    id: i64,
    username: String,
    password: String,
}

#[derive(Clone)]
struct VehicleRow {
    id: i64,
    user: i64,
    vehicle_name: String,
    release_year: i32,
    price: Decimal,
    segment: i64,
    brand: i64,
}

/// All tables of the fake backend. Ids are sequential per table.
#[derive(Default)]
pub struct Tables {
    users: BTreeMap<i64, User>,
    tokens: BTreeMap<String, i64>,
    segments: BTreeMap<i64, Segment>,
    brands: BTreeMap<i64, Brand>,
    vehicles: BTreeMap<i64, VehicleRow>,
    last_id: BTreeMap<&'static str, i64>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let id = self.last_id.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn user_for_token(&self, token: &str) -> Option<&User> {
        self.tokens.get(token).and_then(|id| self.users.get(id))
    }

    fn render_vehicle(&self, row: &VehicleRow) -> Vehicle {
        Vehicle {
            id: row.id,
            vehicle_name: row.vehicle_name.clone(),
            release_year: row.release_year,
            price: row.price,
            segment: row.segment,
            brand: row.brand,
            segment_name: self
                .segments
                .get(&row.segment)
                .map(|s| s.segment_name.clone())
                .unwrap_or_default(),
            brand_name: self
                .brands
                .get(&row.brand)
                .map(|b| b.brand_name.clone())
                .unwrap_or_default(),
        }
    }
}

pub type Db = Arc<RwLock<Tables>>;

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

fn error(status: StatusCode, body: Value) -> (StatusCode, Json<Value>) {
    (status, Json(body))
}

fn field_error(field: &str, message: &str) -> (StatusCode, Json<Value>) {
    error(StatusCode::BAD_REQUEST, json!({ field: [message] }))
}

fn not_found() -> (StatusCode, Json<Value>) {
    error(StatusCode::NOT_FOUND, json!({"detail": "Not found."}))
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Tables::default()));
    Router::new()
        .route("/api/create/", post(create_user))
        .route("/api/auth/", post(obtain_token))
        .route(
            "/api/profile/",
            get(get_profile).put(profile_not_allowed).patch(profile_not_allowed),
        )
        .route("/api/segments/", get(list_segments).post(create_segment))
        .route("/api/segments/{id}/", put(update_segment).get(get_segment).delete(delete_segment))
        .route("/api/brands/", get(list_brands).post(create_brand))
        .route("/api/brands/{id}/", put(update_brand).get(get_brand).delete(delete_brand))
        .route("/api/vehicles/", get(list_vehicles).post(create_vehicle))
        .route("/api/vehicles/{id}/", put(update_vehicle).get(get_vehicle).delete(delete_vehicle))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Resolve `Authorization: token <key>` to a user id.
fn authenticate(tables: &Tables, headers: &HeaderMap) -> ApiResult<i64> {
    let unauthorized = || {
        error(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Authentication credentials were not provided."}),
        )
    };
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(unauthorized)?;
    let key = value
        .strip_prefix("token ")
        .or_else(|| value.strip_prefix("Token "))
        .ok_or_else(unauthorized)?;
    tables.user_for_token(key.trim()).map(|user| user.id).ok_or_else(|| {
        error(StatusCode::UNAUTHORIZED, json!({"detail": "Invalid token."}))
    })
}

fn required_name(field: &str, value: &str) -> ApiResult<String> {
    if value.trim().is_empty() {
        return Err(field_error(field, "This field may not be blank."));
    }
    Ok(value.to_string())
}

fn validate_vehicle(tables: &Tables, input: &VehicleInput) -> ApiResult<()> {
    required_name("vehicle_name", &input.vehicle_name)?;
    let mut price = input.price;
    if price.scale() > 2 {
        return Err(field_error("price", "Ensure that there are no more than 2 decimal places."));
    }
    price.rescale(2);
    if price.mantissa().abs() > i128::from(MAX_PRICE_CENTS) {
        return Err(field_error("price", "Ensure that there are no more than 6 digits in total."));
    }
    if !tables.segments.contains_key(&input.segment) {
        return Err(field_error("segment", "Invalid pk - object does not exist."));
    }
    if !tables.brands.contains_key(&input.brand) {
        return Err(field_error("brand", "Invalid pk - object does not exist."));
    }
    Ok(())
}

fn two_places(mut price: Decimal) -> Decimal {
    price.rescale(2);
    price
}

// --- users ---

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<Profile>)> {
    required_name("username", &input.username)?;
    if input.password.len() < MIN_PASSWORD_LEN {
        return Err(field_error(
            "password",
            "Ensure this field has at least 5 characters.",
        ));
    }
    let mut tables = db.write().await;
    if tables.users.values().any(|u| u.username == input.username) {
        return Err(field_error("username", "A user with that username already exists."));
    }
    let id = tables.next_id("users");
    tables.users.insert(
        id,
        User {
            id,
            username: input.username.clone(),
            password: input.password,
        },
    );
    info!(id, username = %input.username, "user created");
    Ok((
        StatusCode::CREATED,
        Json(Profile {
            id,
            username: input.username,
        }),
    ))
}

async fn obtain_token(
    State(db): State<Db>,
    Json(input): Json<Credentials>,
) -> ApiResult<Json<Value>> {
    let mut tables = db.write().await;
    let user_id = tables
        .users
        .values()
        .find(|u| {
            !input.username.is_empty()
                && !input.password.is_empty()
                && u.username == input.username
                && u.password == input.password
        })
        .map(|u| u.id)
        .ok_or_else(|| {
            field_error("non_field_errors", "Unable to log in with provided credentials.")
        })?;

    // One token per user, reused across logins.
    let existing = tables
        .tokens
        .iter()
        .find(|(_, id)| **id == user_id)
        .map(|(key, _)| key.clone());
    let key = match existing {
        Some(key) => key,
        None => {
            let key = Uuid::new_v4().simple().to_string();
            tables.tokens.insert(key.clone(), user_id);
            key
        }
    };
    Ok(Json(json!({ "token": key })))
}

async fn get_profile(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Profile>> {
    let tables = db.read().await;
    let user_id = authenticate(&tables, &headers)?;
    let user = tables.users.get(&user_id).ok_or_else(not_found)?;
    Ok(Json(Profile {
        id: user.id,
        username: user.username.clone(),
    }))
}

async fn profile_not_allowed() -> (StatusCode, Json<Value>) {
    error(
        StatusCode::METHOD_NOT_ALLOWED,
        json!({"message": "PUT/PATCH method is not allowed"}),
    )
}

// --- segments ---

async fn list_segments(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Vec<Segment>>> {
    let tables = db.read().await;
    authenticate(&tables, &headers)?;
    Ok(Json(tables.segments.values().cloned().collect()))
}

async fn get_segment(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Segment>> {
    let tables = db.read().await;
    authenticate(&tables, &headers)?;
    tables.segments.get(&id).cloned().map(Json).ok_or_else(not_found)
}

async fn create_segment(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<SegmentInput>,
) -> ApiResult<(StatusCode, Json<Segment>)> {
    let mut tables = db.write().await;
    authenticate(&tables, &headers)?;
    let segment_name = required_name("segment_name", &input.segment_name)?;
    let segment = Segment {
        id: tables.next_id("segments"),
        segment_name,
    };
    tables.segments.insert(segment.id, segment.clone());
    Ok((StatusCode::CREATED, Json(segment)))
}

async fn update_segment(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<SegmentInput>,
) -> ApiResult<Json<Segment>> {
    let mut tables = db.write().await;
    authenticate(&tables, &headers)?;
    let segment_name = required_name("segment_name", &input.segment_name)?;
    let segment = tables.segments.get_mut(&id).ok_or_else(not_found)?;
    segment.segment_name = segment_name;
    Ok(Json(segment.clone()))
}

async fn delete_segment(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let mut tables = db.write().await;
    authenticate(&tables, &headers)?;
    tables.segments.remove(&id).ok_or_else(not_found)?;
    tables.vehicles.retain(|_, v| v.segment != id);
    Ok(StatusCode::NO_CONTENT)
}

// --- brands ---

async fn list_brands(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Vec<Brand>>> {
    let tables = db.read().await;
    authenticate(&tables, &headers)?;
    Ok(Json(tables.brands.values().cloned().collect()))
}

async fn get_brand(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Brand>> {
    let tables = db.read().await;
    authenticate(&tables, &headers)?;
    tables.brands.get(&id).cloned().map(Json).ok_or_else(not_found)
}

async fn create_brand(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<BrandInput>,
) -> ApiResult<(StatusCode, Json<Brand>)> {
    let mut tables = db.write().await;
    authenticate(&tables, &headers)?;
    let brand_name = required_name("brand_name", &input.brand_name)?;
    let brand = Brand {
        id: tables.next_id("brands"),
        brand_name,
    };
    tables.brands.insert(brand.id, brand.clone());
    Ok((StatusCode::CREATED, Json(brand)))
}

async fn update_brand(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<BrandInput>,
) -> ApiResult<Json<Brand>> {
    let mut tables = db.write().await;
    authenticate(&tables, &headers)?;
    let brand_name = required_name("brand_name", &input.brand_name)?;
    let brand = tables.brands.get_mut(&id).ok_or_else(not_found)?;
    brand.brand_name = brand_name;
    Ok(Json(brand.clone()))
}

async fn delete_brand(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let mut tables = db.write().await;
    authenticate(&tables, &headers)?;
    tables.brands.remove(&id).ok_or_else(not_found)?;
    tables.vehicles.retain(|_, v| v.brand != id);
    Ok(StatusCode::NO_CONTENT)
}

// --- vehicles ---

async fn list_vehicles(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Json<Vec<Vehicle>>> {
    let tables = db.read().await;
    authenticate(&tables, &headers)?;
    Ok(Json(
        tables
            .vehicles
            .values()
            .map(|row| tables.render_vehicle(row))
            .collect(),
    ))
}

async fn get_vehicle(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vehicle>> {
    let tables = db.read().await;
    authenticate(&tables, &headers)?;
    let row = tables.vehicles.get(&id).ok_or_else(not_found)?;
    Ok(Json(tables.render_vehicle(row)))
}

async fn create_vehicle(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<VehicleInput>,
) -> ApiResult<(StatusCode, Json<Vehicle>)> {
    let mut tables = db.write().await;
    let user = authenticate(&tables, &headers)?;
    validate_vehicle(&tables, &input)?;
    let row = VehicleRow {
        id: tables.next_id("vehicles"),
        user,
        vehicle_name: input.vehicle_name,
        release_year: input.release_year,
        price: two_places(input.price),
        segment: input.segment,
        brand: input.brand,
    };
    tables.vehicles.insert(row.id, row.clone());
    info!(id = row.id, owner = row.user, "vehicle created");
    Ok((StatusCode::CREATED, Json(tables.render_vehicle(&row))))
}

async fn update_vehicle(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<VehicleInput>,
) -> ApiResult<Json<Vehicle>> {
    let mut tables = db.write().await;
    authenticate(&tables, &headers)?;
    if !tables.vehicles.contains_key(&id) {
        return Err(not_found());
    }
    validate_vehicle(&tables, &input)?;
    let row = tables.vehicles.get_mut(&id).ok_or_else(not_found)?;
    row.vehicle_name = input.vehicle_name;
    row.release_year = input.release_year;
    row.price = two_places(input.price);
    row.segment = input.segment;
    row.brand = input.brand;
    let row = row.clone();
    Ok(Json(tables.render_vehicle(&row)))
}

async fn delete_vehicle(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let mut tables = db.write().await;
    authenticate(&tables, &headers)?;
    tables.vehicles.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_serializes_price_as_string() {
        let vehicle = Vehicle {
            id: 1,
            vehicle_name: "MODEL S".to_string(),
            release_year: 2019,
            price: two_places(Decimal::new(500, 0)),
            segment: 1,
            brand: 1,
            segment_name: "Sedan".to_string(),
            brand_name: "Tesla".to_string(),
        };
        let json = serde_json::to_value(&vehicle).unwrap();
        assert_eq!(json["price"], "500.00");
        assert_eq!(json["segment_name"], "Sedan");
    }

    #[test]
    fn vehicle_input_ignores_read_only_fields() {
        let input: VehicleInput = serde_json::from_str(
            r#"{"id":0,"vehicle_name":"Leaf","release_year":2020,"price":"300.12",
                "segment":1,"brand":2,"segment_name":"x","brand_name":"y"}"#,
        )
        .unwrap();
        assert_eq!(input.vehicle_name, "Leaf");
        assert_eq!(input.price, Decimal::new(30012, 2));
    }

    #[test]
    fn vehicle_input_rejects_missing_segment() {
        let result: Result<VehicleInput, _> = serde_json::from_str(
            r#"{"vehicle_name":"Leaf","release_year":2020,"price":"300.12","brand":2}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn price_validation_limits() {
        let mut tables = Tables::default();
        tables.segments.insert(1, Segment { id: 1, segment_name: "SUV".into() });
        tables.brands.insert(1, Brand { id: 1, brand_name: "Audi".into() });
        let input = |price: Decimal| VehicleInput {
            vehicle_name: "Q7".into(),
            release_year: 2020,
            price,
            segment: 1,
            brand: 1,
        };
        assert!(validate_vehicle(&tables, &input(Decimal::new(999_999, 2))).is_ok());
        assert!(validate_vehicle(&tables, &input(Decimal::new(1_000_000, 2))).is_err());
        assert!(validate_vehicle(&tables, &input(Decimal::new(1001, 3))).is_err());
    }

    #[test]
    fn vehicle_must_reference_existing_segment_and_brand() {
        let mut tables = Tables::default();
        tables.segments.insert(1, Segment { id: 1, segment_name: "SUV".into() });
        let input = VehicleInput {
            vehicle_name: "Q7".into(),
            release_year: 2020,
            price: Decimal::new(100, 0),
            segment: 1,
            brand: 9,
        };
        let (status, body) = validate_vehicle(&tables, &input).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.0.get("brand").is_some());
    }

    #[tokio::test]
    async fn created_vehicle_records_its_owner() {
        let db: Db = Arc::new(RwLock::new(Tables::default()));
        {
            let mut tables = db.write().await;
            tables.users.insert(
                7,
                User {
                    id: 7,
                    username: "dummy".into(),
                    password: "dummy_pw".into(),
                },
            );
            tables.tokens.insert("abc".into(), 7);
            tables.segments.insert(1, Segment { id: 1, segment_name: "SUV".into() });
            tables.brands.insert(1, Brand { id: 1, brand_name: "Audi".into() });
        }
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "token abc".parse().unwrap());
        let input = VehicleInput {
            vehicle_name: "Q7".into(),
            release_year: 2020,
            price: Decimal::new(500, 0),
            segment: 1,
            brand: 1,
        };

        let (status, Json(vehicle)) = create_vehicle(State(db.clone()), headers, Json(input)).await.unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(db.read().await.vehicles[&vehicle.id].user, 7);
    }

    #[test]
    fn ids_are_sequential_per_table() {
        let mut tables = Tables::default();
        assert_eq!(tables.next_id("segments"), 1);
        assert_eq!(tables.next_id("segments"), 2);
        assert_eq!(tables.next_id("brands"), 1);
    }
}
