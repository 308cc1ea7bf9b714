use futures::{SinkExt, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use shared::{
    domain::{Order, OrderId, OrderStatus, Table},
    protocol::{ChangeStatusRequest, ClientEvent, CreateOrderRequest, ServerEvent},
};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

mod board;
pub mod error;

pub use board::OrderBoard;
pub use error::{ClientError, Result};

/// Talks to one order server over both of its surfaces: plain HTTP for
/// reads and a WebSocket session for live updates and mutations.
#[derive(Debug, Clone)]
pub struct OrderClient {
    http: Client,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl OrderClient {
    pub fn new(server_url: &str) -> Result<Self> {
        Ok(Self {
            http: Client::new(),
            base: parse_base_url(server_url)?,
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.base
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        let response = self.http.get(self.endpoint("orders")?).send().await?;
        read_json(response).await
    }

    /// `Ok(None)` when the server has no order under `id`.
    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let response = self
            .http
            .get(self.endpoint(&format!("orders/{id}"))?)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(response).await.map(Some)
    }

    pub async fn list_tables(&self) -> Result<Vec<Table>> {
        let response = self.http.get(self.endpoint("tables")?).send().await?;
        read_json(response).await
    }

    /// Opens a realtime session. Its first event is always the server's
    /// `initial-orders` snapshot.
    pub async fn connect(&self) -> Result<RealtimeSession> {
        let ws_url = self.websocket_url()?;
        let (stream, _) = connect_async(ws_url.as_str()).await?;
        info!(url = %ws_url, "realtime session opened");
        Ok(RealtimeSession { stream })
    }

    pub fn websocket_url(&self) -> Result<Url> {
        let mut url = self.endpoint("ws")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|()| ClientError::InvalidUrl {
            url: self.base.to_string(),
            reason: "cannot derive a websocket url".into(),
        })?;
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|err| ClientError::InvalidUrl {
            url: self.base.to_string(),
            reason: err.to_string(),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let invalid = |reason: String| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let mut url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http:// or https:// url".into()));
    }
    // Relative joins replace the last path segment unless it ends in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

pub struct RealtimeSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RealtimeSession {
    pub async fn create_order(&mut self, request: CreateOrderRequest) -> Result<()> {
        self.send(&ClientEvent::CreateOrder(request)).await
    }

    pub async fn change_status(&mut self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        self.send(&ClientEvent::ChangeStatus(ChangeStatusRequest::new(
            order_id, status,
        )))
        .await
    }

    /// Next event from the server, or `None` once the server closed the
    /// session. Control frames are handled here and never surface.
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
                Message::Close(frame) => {
                    debug!(?frame, "server closed realtime session");
                    return Ok(None);
                }
                Message::Binary(_) => warn!("ignoring binary frame from server"),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }

    async fn send(&mut self, event: &ClientEvent) -> Result<()> {
        let text = serde_json::to_string(event)?;
        self.stream.send(Message::Text(text)).await.map_err(|err| match err {
            tokio_tungstenite::tungstenite::Error::ConnectionClosed
            | tokio_tungstenite::tungstenite::Error::AlreadyClosed => ClientError::Closed,
            other => ClientError::WebSocket(other),
        })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
