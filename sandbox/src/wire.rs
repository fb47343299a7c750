//! Daemon wire protocol: framing only (`spec.md` §6.3).
//!
//! One newline-delimited JSON record per line. Unknown records are
//! ignored rather than rejected, so a future client speaking a superset
//! of this protocol degrades gracefully against an older daemon.

use {
    serde::{Deserialize, Serialize},
    std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicU64, Ordering},
            Mutex,
        },
    },
};

/// A record sent from a client to the daemon.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage
{
    Input { data: String },
    Resize { cols: u32, rows: u32 },
}

/// A record sent from the daemon to a client.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage
{
    Output { data: String },
}

/// Decode one line of client input. Malformed JSON or a record with an
/// unrecognized `type` is ignored (`spec.md` §6.3 "unknown records are
/// ignored"), returning `None`.
pub fn parse_client_message(line: &str) -> Option<ClientMessage>
{
    serde_json::from_str(line.trim_end_matches(['\n', '\r'])).ok()
}

/// Encode a server-to-client record as a single JSON line, newline
/// included.
pub fn encode_server_message(message: &ServerMessage) -> String
{
    format!("{}\n", serde_json::to_string(message).expect("ServerMessage always serializes"))
}

pub type ClientId = u64;

/// Tracks attached clients of a detached session: broadcasts output to
/// all of them, forwards input from any of them, and remembers the
/// canonical terminal size (`spec.md` §6.3: "the canonical terminal size
/// is the first attached client's size; resize events from that client
/// update it").
#[derive(Default)]
pub struct Broadcast
{
    next_id: AtomicU64,
    clients: Mutex<HashMap<ClientId, std::sync::mpsc::Sender<String>>>,
    canonical_client: Mutex<Option<ClientId>>,
    terminal_size: Mutex<Option<(u32, u32)>>,
}

impl Broadcast
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Attach a new client, returning its id and the receiving end of its
    /// output stream.
    pub fn attach(&self) -> (ClientId, std::sync::mpsc::Receiver<String>)
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = std::sync::mpsc::channel();
        self.clients.lock().unwrap().insert(id, sender);
        self.canonical_client.lock().unwrap().get_or_insert(id);
        (id, receiver)
    }

    pub fn detach(&self, id: ClientId)
    {
        self.clients.lock().unwrap().remove(&id);
        let mut canonical = self.canonical_client.lock().unwrap();
        if *canonical == Some(id) {
            *canonical = None;
        }
    }

    /// Deliver `data` to every attached client.
    pub fn broadcast_output(&self, data: &str)
    {
        let line = encode_server_message(&ServerMessage::Output { data: data.to_string() });
        self.clients.lock().unwrap().retain(|_, sender| sender.send(line.clone()).is_ok());
    }

    /// Apply a resize from `id`, only if `id` is the canonical client.
    pub fn resize(&self, id: ClientId, cols: u32, rows: u32)
    {
        if *self.canonical_client.lock().unwrap() == Some(id) {
            *self.terminal_size.lock().unwrap() = Some((cols, rows));
        }
    }

    pub fn terminal_size(&self) -> Option<(u32, u32)>
    {
        *self.terminal_size.lock().unwrap()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn unknown_record_type_is_ignored()
    {
        assert_eq!(parse_client_message(r#"{"type":"ping"}"#), None);
    }

    #[test]
    fn parses_input_and_resize_records()
    {
        assert_eq!(parse_client_message(r#"{"type":"input","data":"ls\n"}"#), Some(ClientMessage::Input { data: "ls\n".to_string() }));
        assert_eq!(parse_client_message(r#"{"type":"resize","cols":80,"rows":24}"#), Some(ClientMessage::Resize { cols: 80, rows: 24 }));
    }

    #[test]
    fn first_attached_client_is_canonical_for_resize()
    {
        let broadcast = Broadcast::new();
        let (first, _rx1) = broadcast.attach();
        let (second, _rx2) = broadcast.attach();
        broadcast.resize(second, 10, 10);
        assert_eq!(broadcast.terminal_size(), None);
        broadcast.resize(first, 80, 24);
        assert_eq!(broadcast.terminal_size(), Some((80, 24)));
    }

    #[test]
    fn output_is_broadcast_to_every_attached_client()
    {
        let broadcast = Broadcast::new();
        let (_id1, rx1) = broadcast.attach();
        let (_id2, rx2) = broadcast.attach();
        broadcast.broadcast_output("hello");
        let expected = encode_server_message(&ServerMessage::Output { data: "hello".to_string() });
        assert_eq!(rx1.recv().unwrap(), expected);
        assert_eq!(rx2.recv().unwrap(), expected);
    }
}
