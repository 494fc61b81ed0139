use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use actix_web::cookie::Cookie;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use base64::engine::general_purpose::STANDARD as B64Engine;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use act::api::{
    ApiDescription, AuthEndpointDescriptor, AuthenticatorKind, FieldDescriptor, HttpMethod,
    ParameterLocation, ResourceLocationDescriptor, RouteDescriptor, SecuritySchemeDescriptor,
};
use act::policy::Action;

/// A tiny todo API. Todo 1 is owned by alice and visible to carol. Carol's
/// account is locked, so her logins are always rejected.
pub struct MockState {
    passwords: HashMap<&'static str, &'static str>,
    tokens: Mutex<HashMap<String, String>>,
    logins: Mutex<HashMap<String, usize>>,
    counter: AtomicUsize,
}

impl MockState {
    fn new() -> Self {
        let passwords = HashMap::from([("alice", "alice-pw"), ("bob", "bob-pw")]);
        Self {
            passwords,
            tokens: Mutex::new(HashMap::new()),
            logins: Mutex::new(HashMap::new()),
            counter: AtomicUsize::new(0),
        }
    }

    fn login(&self, user: &str, password: &str) -> Option<String> {
        *self.logins.lock().unwrap().entry(user.to_string()).or_default() += 1;
        if self.passwords.get(user) != Some(&password) {
            return None;
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let token = format!("{user}-token-{n}");
        self.tokens
            .lock()
            .unwrap()
            .insert(token.clone(), user.to_string());
        Some(token)
    }

    pub fn login_count(&self, user: &str) -> usize {
        self.logins.lock().unwrap().get(user).copied().unwrap_or(0)
    }

    /// Invalidates every issued token, like a server restart would.
    pub fn revoke_all(&self) {
        self.tokens.lock().unwrap().clear();
    }

    fn current_user(&self, req: &HttpRequest) -> Option<String> {
        let auth = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok());
        if let Some(value) = auth {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return self.tokens.lock().unwrap().get(token).cloned();
            }
            if let Some(payload) = value.strip_prefix("Basic ") {
                let decoded = B64Engine.decode(payload).ok()?;
                let decoded = String::from_utf8(decoded).ok()?;
                let (user, password) = decoded.split_once(':')?;
                if self.passwords.get(user) == Some(&password) {
                    return Some(user.to_string());
                }
            }
            return None;
        }
        let cookie = req.cookie("sid")?;
        self.tokens.lock().unwrap().get(cookie.value()).cloned()
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(state: web::Data<MockState>, body: web::Json<LoginRequest>) -> HttpResponse {
    match state.login(&body.email, &body.password) {
        Some(token) => HttpResponse::Ok().json(json!({ "data": { "token": token } })),
        None => HttpResponse::BadRequest().json(json!({ "error": "invalid credentials" })),
    }
}

async fn session_login(state: web::Data<MockState>, body: web::Json<LoginRequest>) -> HttpResponse {
    match state.login(&body.email, &body.password) {
        Some(token) => HttpResponse::Ok()
            .cookie(Cookie::build("sid", token).path("/").finish())
            .finish(),
        None => HttpResponse::BadRequest().finish(),
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn me(state: web::Data<MockState>, req: HttpRequest) -> HttpResponse {
    match state.current_user(&req) {
        Some(user) => HttpResponse::Ok().json(json!({ "user": user })),
        None => HttpResponse::Unauthorized().finish(),
    }
}

async fn always_unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().finish()
}

fn todo_access(user: &str, id: u32, delete: bool) -> bool {
    match (id, delete) {
        (1, false) => user == "alice" || user == "carol",
        (1, true) => user == "alice",
        _ => false,
    }
}

async fn get_todo(state: web::Data<MockState>, req: HttpRequest, id: web::Path<u32>) -> HttpResponse {
    let user = match state.current_user(&req) {
        Some(user) => user,
        None => return HttpResponse::Unauthorized().finish(),
    };
    if !todo_access(&user, *id, false) {
        return HttpResponse::Forbidden().finish();
    }
    HttpResponse::Ok().json(json!({ "id": *id, "title": "buy milk" }))
}

async fn delete_todo(state: web::Data<MockState>, req: HttpRequest, id: web::Path<u32>) -> HttpResponse {
    let user = match state.current_user(&req) {
        Some(user) => user,
        None => return HttpResponse::Unauthorized().finish(),
    };
    if !todo_access(&user, *id, true) {
        return HttpResponse::Forbidden().finish();
    }
    HttpResponse::NoContent().finish()
}

pub struct MockServer {
    pub base_url: String,
    pub state: web::Data<MockState>,
}

/// Starts the mock API on a random local port. Must be called inside a
/// tokio runtime.
pub fn start() -> MockServer {
    let state = web::Data::new(MockState::new());
    let data = state.clone();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/login", web::post().to(login))
            .route("/session", web::post().to(session_login))
            .route("/health", web::get().to(health))
            .route("/me", web::get().to(me))
            .route("/unauthorized", web::get().to(always_unauthorized))
            .route("/todos/{id}", web::get().to(get_todo))
            .route("/todos/{id}", web::delete().to(delete_todo))
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();
    tokio::spawn(server);

    MockServer {
        base_url: format!("http://{addr}"),
        state,
    }
}

pub fn bearer_scheme() -> SecuritySchemeDescriptor {
    SecuritySchemeDescriptor {
        name: String::from("bearerAuth"),
        kind: AuthenticatorKind::HttpBearer,
        auth_endpoint: Some(AuthEndpointDescriptor {
            path: String::from("/login"),
            method: HttpMethod::Post,
            identifier_field: FieldDescriptor::new("email", ParameterLocation::Body),
            password_field: FieldDescriptor::new("password", ParameterLocation::Body),
            response_field: FieldDescriptor::new("data.token", ParameterLocation::Body),
        }),
    }
}

pub fn cookie_scheme() -> SecuritySchemeDescriptor {
    SecuritySchemeDescriptor {
        name: String::from("cookieAuth"),
        kind: AuthenticatorKind::ApiKeyCookie,
        auth_endpoint: Some(AuthEndpointDescriptor {
            path: String::from("/session"),
            method: HttpMethod::Post,
            identifier_field: FieldDescriptor::new("email", ParameterLocation::Body),
            password_field: FieldDescriptor::new("password", ParameterLocation::Body),
            response_field: FieldDescriptor::new("sid", ParameterLocation::Cookie),
        }),
    }
}

pub fn basic_scheme() -> SecuritySchemeDescriptor {
    SecuritySchemeDescriptor {
        name: String::from("basicAuth"),
        kind: AuthenticatorKind::HttpBasic,
        auth_endpoint: None,
    }
}

pub fn todo_route(method: HttpMethod, action: Action, scheme: &str) -> RouteDescriptor {
    RouteDescriptor {
        path: String::from("/todos/{id}"),
        method,
        security: Some(scheme.to_string()),
        resources: vec![ResourceLocationDescriptor {
            resource_name: String::from("Todo"),
            resource_access: action,
            parameter_name: Some(String::from("id")),
            parameter_location: Some(ParameterLocation::Path),
        }],
    }
}

pub fn plain_route(path: &str, security: Option<&str>) -> RouteDescriptor {
    RouteDescriptor {
        path: path.to_string(),
        method: HttpMethod::Get,
        security: security.map(String::from),
        resources: vec![],
    }
}

pub fn api(routes: Vec<RouteDescriptor>) -> ApiDescription {
    ApiDescription {
        routes,
        security_schemes: vec![bearer_scheme(), cookie_scheme(), basic_scheme()],
    }
}
