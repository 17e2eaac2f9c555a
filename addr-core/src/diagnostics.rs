//! # Buffer de Diagnósticos
//!
//! Anel de capacidade fixa com registros `{fatal?, mensagem}`. Se houver um
//! destino configurado (`sink`), cada mensagem é escrita imediatamente; caso
//! contrário (ou se a escrita falhar) fica guardada até ser drenada.
//!
//! Quando o anel enche, o registro mais antigo é descartado e um único aviso
//! "losing old ones" é emitido até a próxima drenagem.

use std::collections::VecDeque;
use std::fmt;
use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Capacidade padrão do anel.
pub const MAX_ERRORS: usize = 512;
/// Tamanho máximo de uma mensagem, em bytes.
pub const MAX_MESSAGE_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub is_fatal: bool,
    pub message: String,
}

pub struct ErrorBuffer {
    records: VecDeque<ErrorRecord>,
    capacity: usize,
    sink: Option<Box<dyn Write + Send>>,
    next_fatal: bool,
    losing: bool,
}

impl ErrorBuffer {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ERRORS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            sink: None,
            next_fatal: true,
            losing: false,
        }
    }

    /// Direciona as mensagens para um destino em vez de guardá-las.
    pub fn with_sink(mut self, sink: Box<dyn Write + Send>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Marca se o próximo registro é fatal. Volta a `true` após cada registro.
    pub fn set_next_fatal(&mut self, fatal: bool) {
        self.next_fatal = fatal;
    }

    /// Registra uma mensagem.
    pub fn register(&mut self, message: impl Into<String>) {
        let message = message.into();
        let is_fatal = std::mem::replace(&mut self.next_fatal, true);

        if message.len() > MAX_MESSAGE_LEN {
            warn!(len = message.len(), "error message too long, dropped");
            return;
        }

        if let Some(sink) = self.sink.as_mut() {
            match writeln!(sink, "{}", message) {
                Ok(()) => return,
                // o registro fica no anel para não se perder
                Err(err) => warn!(%err, "error sink write failed, buffering message"),
            }
        }

        if self.records.len() == self.capacity {
            if !self.losing {
                warn!(capacity = self.capacity, "too many errors - losing old ones");
                self.losing = true;
            }
            self.records.pop_front();
        }
        self.records.push_back(ErrorRecord { is_fatal, message });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Esvazia o anel devolvendo os registros em ordem de chegada.
    pub fn drain(&mut self) -> Vec<ErrorRecord> {
        self.losing = false;
        self.records.drain(..).collect()
    }

    /// Drena e registra no log tudo o que ainda estiver guardado.
    pub fn close(mut self) {
        for record in self.drain() {
            if record.is_fatal {
                error!("ERROR: {}", record.message);
            } else {
                info!("{}", record.message);
            }
        }
    }
}

impl Default for ErrorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorBuffer")
            .field("records", &self.records)
            .field("capacity", &self.capacity)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_drain_in_order() {
        let mut buffer = ErrorBuffer::new();
        buffer.register("primeiro");
        buffer.set_next_fatal(false);
        buffer.register("segundo");
        let drained = buffer.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "primeiro");
        assert!(drained[0].is_fatal);
        // set_next_fatal vale só para o registro seguinte
        assert!(!drained[1].is_fatal);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut buffer = ErrorBuffer::with_capacity(3);
        for i in 0..5 {
            buffer.register(format!("msg {}", i));
        }
        let messages: Vec<String> = buffer.drain().into_iter().map(|r| r.message).collect();
        assert_eq!(messages, vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn test_sink_bypasses_buffer() {
        let sink = SharedSink::default();
        let mut buffer = ErrorBuffer::new().with_sink(Box::new(sink.clone()));
        buffer.register("direto");
        assert!(buffer.is_empty());
        let written = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "direto\n");
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "fechado"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_sink_keeps_record() {
        let mut buffer = ErrorBuffer::new().with_sink(Box::new(BrokenSink));
        buffer.set_next_fatal(false);
        buffer.register("sem destino");
        let drained = buffer.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].message, "sem destino");
        assert!(!drained[0].is_fatal);
    }

    #[test]
    fn test_long_message_rejected() {
        let mut buffer = ErrorBuffer::new();
        buffer.register("x".repeat(MAX_MESSAGE_LEN + 1));
        assert!(buffer.is_empty());
    }
}
