#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use invoice_reminder::invoice::{Invoice, PaymentStatus};

/// Build an invoice with the fields the filter and batch logic look at
pub fn invoice(id: &str, account: &str, department: &str, status: &str, balance: f64) -> Invoice {
    Invoice {
        id: id.to_string(),
        account: account.to_string(),
        department: department.to_string(),
        billing_period: "2025-01".to_string(),
        due_date: "2025-02-01".to_string(),
        amount: balance,
        balance_due: Some(balance),
        status: status.to_string(),
        payment_status: PaymentStatus::parse(status),
        paid_at: None,
        processed_at: None,
        updated_at: None,
        payer_account_id: None,
        email: Some(format!("{}@example.com", account.to_lowercase())),
        service_provider: None,
        object_key: format!("invoices/2025-01/{id}.pdf"),
    }
}

pub const INVOICES_JSON: &str = r#"[
  {"invoice_id": "INV-001", "account_name": "Acme Cloud", "department_name": "Research",
   "billing_period": "2025-01", "due_date": "2025-02-15", "invoice_amount": "1,200.50",
   "balance_due": 1200.5, "status": "Due", "payment_status": "Unpaid",
   "email": "research@example.com", "payer_account_id": "111",
   "s3_object_key": "invoices/2025-01/INV-001.pdf"},
  {"invoice_id": "INV-002", "account_name": "Acme Cloud", "department_name": "Research",
   "billing_period": "2025-01", "due_date": "2025-01-15", "invoice_amount": 300,
   "balance_due": "300", "status": "Over Due", "payment_status": "unpaid",
   "s3_object_key": "invoices/2025-01/INV-002.pdf"},
  {"invoice_id": "INV-003", "account_name": "Beta Labs", "department_name": "Finance",
   "billing_period": "2025-02", "due_date": "2025-03-01", "invoice_amount": 50,
   "balance_due": 0, "status": "paid", "payment_status": "paid",
   "s3_object_key": "invoices/2025-02/INV-003.pdf"},
  {"invoice_id": "INV-004", "account_name": "Gamma Ops", "department_name": "Operations",
   "billing_period": "2025-02", "due_date": "2025-03-10", "invoice_amount": 75.25,
   "status": "due", "payment_status": "due",
   "s3_object_key": "invoices/2025-02/INV-004.pdf"}
]"#;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

struct Route {
    method: &'static str,
    path: &'static str,
    status: u16,
    body: String,
}

/// Canned-response HTTP backend on a random local port
pub struct MockBackend {
    port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct MockBackendBuilder {
    routes: Vec<Route>,
}

impl MockBackendBuilder {
    pub fn route(mut self, method: &'static str, path: &'static str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            method,
            path,
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn start(self) -> MockBackend {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let routes = self.routes;

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                handle(stream, &routes, &recorded);
            }
        });

        MockBackend { port, requests }
    }
}

fn handle(mut stream: TcpStream, routes: &[Route], recorded: &Mutex<Vec<RecordedRequest>>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            if name == "content-length" {
                content_length = value.trim().parse().unwrap_or(0);
            } else if name == "authorization" {
                authorization = Some(value.trim().to_string());
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).unwrap();
    }

    recorded.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        authorization,
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let (status, payload) = routes
        .iter()
        .find(|r| r.method == method && r.path == path)
        .map(|r| (r.status, r.body.clone()))
        .unwrap_or((404, r#"{"error":"not found"}"#.to_string()));

    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        if status < 400 { "OK" } else { "Error" },
        payload.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

impl MockBackend {
    pub fn builder() -> MockBackendBuilder {
        MockBackendBuilder { routes: Vec::new() }
    }

    /// Base URL for config.toml, e.g. http://127.0.0.1:4321/api
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/api", self.port)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}
