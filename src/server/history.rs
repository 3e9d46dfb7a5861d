// Request history for debug endpoints
//
// Bounded ring buffer of recent requests and their responses, plus a request
// counter. Oldest entries are evicted first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub remote_addr: Option<String>,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// Seconds
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub request: RequestRecord,
    pub response: Option<ResponseRecord>,
}

pub struct RequestHistory {
    entries: Mutex<VecDeque<HistoryEntry>>,
    capacity: usize,
    request_count: AtomicU64,
    started_at: DateTime<Utc>,
}

impl Default for RequestHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RequestHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            request_count: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Record an incoming request, evicting the oldest entry when full
    pub fn push_request(&self, request: RequestRecord) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(HistoryEntry {
            request,
            response: None,
        });
    }

    /// Attach the response to its request, if it is still in the buffer
    pub fn complete(&self, id: &str, response: ResponseRecord) {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.lock();
        if let Some(entry) = entries.iter_mut().rev().find(|e| e.request.id == id) {
            entry.response = Some(response);
        }
    }

    /// Oldest first
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<HistoryEntry>> {
        // A poisoned buffer only holds diagnostics; keep using it
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str) -> RequestRecord {
        RequestRecord {
            id: id.to_string(),
            timestamp: Utc::now(),
            method: "POST".to_string(),
            path: "/api/tools/nmap".to_string(),
            remote_addr: None,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    fn response(status: u16) -> ResponseRecord {
        ResponseRecord {
            status_code: status,
            headers: BTreeMap::new(),
            duration: 0.01,
            body: None,
        }
    }

    #[test]
    fn test_capacity_and_eviction_order() {
        let history = RequestHistory::new(3);
        for i in 0..5 {
            history.push_request(request(&i.to_string()));
            assert!(history.len() <= 3);
        }

        let ids: Vec<String> = history.snapshot().into_iter().map(|e| e.request.id).collect();
        assert_eq!(ids, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_complete_attaches_response() {
        let history = RequestHistory::new(10);
        history.push_request(request("a"));
        history.push_request(request("b"));
        history.complete("a", response(200));

        let snapshot = history.snapshot();
        assert_eq!(snapshot[0].response.as_ref().unwrap().status_code, 200);
        assert!(snapshot[1].response.is_none());
        assert_eq!(history.request_count(), 1);
    }

    #[test]
    fn test_complete_after_eviction_still_counts() {
        let history = RequestHistory::new(1);
        history.push_request(request("old"));
        history.push_request(request("new"));
        history.complete("old", response(400));

        assert!(history.snapshot()[0].response.is_none());
        assert_eq!(history.request_count(), 1);
    }

    #[test]
    fn test_clear_keeps_counter() {
        let history = RequestHistory::default();
        history.push_request(request("a"));
        history.complete("a", response(200));
        history.clear();

        assert!(history.is_empty());
        assert_eq!(history.request_count(), 1);
        assert_eq!(history.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_serialized_shape() {
        let history = RequestHistory::new(2);
        history.push_request(request("a"));
        let value = serde_json::to_value(history.snapshot()).unwrap();
        assert_eq!(value[0]["request"]["path"], "/api/tools/nmap");
        assert!(value[0]["response"].is_null());
        assert!(value[0]["request"].get("body").is_none());
    }
}
