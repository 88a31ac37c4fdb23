//! Recording transport for unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::transport::Transport;
use crate::{Request, Response, Result};

#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<Response>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(self: &Arc<Self>, status: u16, body: &str) -> Arc<Self> {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(Response::new(status, body)));
        self.clone()
    }

    pub fn fail(self: &Arc<Self>, err: crate::Error) -> Arc<Self> {
        self.replies.lock().unwrap().push_back(Err(err));
        self.clone()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> Request {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Response::new(200, "{}")))
    }
}
