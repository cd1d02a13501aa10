use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::models::ProductSnapshot;
use crate::utils::error::{AppError, Result};

/// Status the manual check always answers with, whatever the cycle did.
pub const PRICE_CHECK_COMPLETED: &str = "Price check completed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Run a price-check cycle now.
    ManualPriceCheck,
    /// Extract the product on the active page, without deciding anything.
    GetProductData,
    SetCheckInterval { minutes: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Response {
    Status(String),
    ProductData(ProductSnapshot),
    /// The page was reached but produced nothing.
    NoProductData,
    Error(String),
}

pub struct Envelope {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

impl Envelope {
    /// The requester may have given up; that is not our problem.
    pub fn respond(self, response: Response) {
        if self.reply.send(response).is_err() {
            tracing::debug!("Requester went away before the response");
        }
    }
}

/// Request/response channel into the watcher service.
#[derive(Clone)]
pub struct MessageBus {
    tx: mpsc::Sender<Envelope>,
}

impl MessageBus {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    pub async fn send(&self, request: Request) -> Result<Response> {
        tracing::debug!("Sending message: {:?}", request);
        let (reply, response) = oneshot::channel();

        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| AppError::Channel("watcher service is not running".to_string()))?;

        response
            .await
            .map_err(|_| AppError::Channel("watcher service dropped the request".to_string()))
    }
}
