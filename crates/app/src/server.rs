use crate::page::{render_page, PageView};
use crate::state::{session_cookie, session_id, AppState};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Form, Multipart, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use pdf_chat_core::{is_pdf_name, Notice, Session, UploadedDocument};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

const UPLOAD_FIELD: &str = "documents";
const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    question: String,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ask", post(ask))
        .route(
            "/process",
            post(process).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/reset", post(reset))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    max_upload_bytes: usize,
    session_ttl: Duration,
) -> anyhow::Result<()> {
    tokio::spawn(sweep_idle_sessions(state.clone(), session_ttl));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("serving on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state, max_upload_bytes)).await?;
    Ok(())
}

async fn sweep_idle_sessions(state: AppState, ttl: Duration) {
    let mut ticker = tokio::time::interval(ttl.min(MAX_SWEEP_PERIOD).max(MIN_SWEEP_PERIOD));
    loop {
        ticker.tick().await;
        let evicted = state.evict_idle(ttl);
        if evicted > 0 {
            info!(evicted, remaining = state.session_count(), "evicted idle sessions");
        }
    }
}

fn render(id: Uuid, session: &mut Session) -> Response {
    let view = PageView {
        notice: session.take_notice(),
        history: session.history(),
        ready: session.is_ready(),
        report: session.report(),
    };
    let body = render_page(&view);
    ([(header::SET_COOKIE, session_cookie(id))], Html(body)).into_response()
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let id = session_id(&headers);
    match state.existing_session(id) {
        Some(session) => {
            let mut session = session.lock().await;
            render(id, &mut session)
        }
        None => render(id, &mut Session::new()),
    }
}

async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AskForm>,
) -> Response {
    let id = session_id(&headers);
    let Some(session) = state.existing_session(id) else {
        info!(session = %id, "question ignored; no documents processed");
        return render(id, &mut Session::new());
    };
    let mut session = session.lock().await;
    session.ask_with_notice(&form.question).await;
    render(id, &mut session)
}

async fn process(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let id = session_id(&headers);
    let session = state.session(id);
    let mut session = session.lock().await;

    match read_documents(&mut multipart).await {
        Ok(documents) => {
            info!(
                session = %id,
                documents = documents.len(),
                sessions = state.session_count(),
                "process requested"
            );
            session
                .process_with_notice(documents, state.pipeline(), state.factory())
                .await;
        }
        Err(error) => {
            warn!(session = %id, %error, "upload could not be read");
            session.set_notice(Notice::error(format!("Upload failed: {error}")));
        }
    }

    render(id, &mut session)
}

async fn reset(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let id = session_id(&headers);
    let notice = Notice::info("Session cleared. Upload PDFs to start again.");

    match state.existing_session(id) {
        Some(session) => {
            let mut session = session.lock().await;
            session.reset();
            session.set_notice(notice);
            render(id, &mut session)
        }
        None => {
            let mut session = Session::new();
            session.set_notice(notice);
            render(id, &mut session)
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

/// Collects the uploaded PDFs in form order. Empty file inputs and non-PDF
/// files are skipped.
async fn read_documents(multipart: &mut Multipart) -> Result<Vec<UploadedDocument>, MultipartError> {
    let mut documents = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        if name.is_empty() && bytes.is_empty() {
            continue;
        }
        if !is_pdf_name(&name) {
            warn!(file = %name, "ignoring non-pdf upload");
            continue;
        }

        documents.push(UploadedDocument::new(name, bytes.to_vec()));
    }

    Ok(documents)
}
