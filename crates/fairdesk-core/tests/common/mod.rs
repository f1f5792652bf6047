// Scripted stand-in for the data service.
#![allow(clippy::unwrap_used, dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fairdesk_api::{Error, Session};
use fairdesk_core::DataService;

/// What the fake answers for one resource.
#[derive(Debug, Clone)]
pub enum Reply {
    Rows(u64),
    /// Service error response.
    Status(u16, Option<&'static str>, &'static str),
    /// Client-side transport failure.
    Timeout,
    /// Never answers.
    Hang,
    Panic(&'static str),
    /// Rejected locally, before any request goes out.
    Unsendable,
}

impl Reply {
    pub fn denied() -> Self {
        Self::Status(401, None, "Invalid API key")
    }

    pub fn unavailable() -> Self {
        Self::Status(503, None, "Service Unavailable")
    }

    pub fn no_rows() -> Self {
        Self::Status(
            406,
            Some("PGRST116"),
            "JSON object requested, multiple (or no) rows returned",
        )
    }
}

#[derive(Default)]
pub struct FakeService {
    replies: Mutex<HashMap<String, Reply>>,
    session: Mutex<Option<Session>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
    reads: AtomicUsize,
    probed: Mutex<Vec<String>>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, resource: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(resource.to_owned(), reply);
    }

    pub fn sign_in(&self, email: &str) {
        *self.session.lock().unwrap() = Some(Session {
            user_id: "9f1c2d4e-0000-4000-8000-000000000001".into(),
            email: Some(email.to_owned()),
            role: Some("authenticated".into()),
        });
    }

    /// Every call sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Row-count probes issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }

    fn reply_for(&self, resource: &str) -> Reply {
        self.replies
            .lock()
            .unwrap()
            .get(resource)
            .cloned()
            .unwrap_or(Reply::Rows(3))
    }

    async fn answer(&self, resource: &str, timeout: Duration) -> Result<u64, Error> {
        let reply = self.reply_for(resource);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match reply {
            Reply::Rows(n) => Ok(n),
            Reply::Status(status, code, message) => Err(Error::Api {
                status,
                code: code.map(str::to_owned),
                message: message.to_owned(),
                hint: None,
            }),
            Reply::Timeout => Err(Error::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap(),
            }),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(0)
            }
            Reply::Panic(message) => panic!("{message}"),
            Reply::Unsendable => Err(Error::InvalidResource(resource.to_owned())),
        }
    }
}

impl DataService for FakeService {
    async fn count_rows(&self, resource: &str, timeout: Duration) -> Result<Option<u64>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.probed.lock().unwrap().push(resource.to_owned());
        self.answer(resource, timeout).await.map(Some)
    }

    async fn read_sample(&self, resource: &str, timeout: Duration) -> Result<usize, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let rows = self.answer(resource, timeout).await?;
        Ok(usize::from(rows > 0))
    }

    async fn current_session(&self, _timeout: Duration) -> Result<Option<Session>, Error> {
        Ok(self.session.lock().unwrap().clone())
    }
}
