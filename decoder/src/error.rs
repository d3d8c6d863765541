use std::{error::Error, fmt, io::Error as IoError};

/// Ошибки при декодировании выписки
#[derive(Debug)]
pub enum DecodeError {
    // обёртки

    /// обёртка std::io::Error
    Io(IoError),

    // логические ошибки

    /// строка похожа на тег, но тело тега не совпало с форматом :NN[X]:
    InvalidTagShape(String),
    /// содержимое тега 60/62 не совпало с фиксированным форматом баланса
    InvalidBalance(String),
    /// содержимое тега 61 не совпало с форматом проводки
    InvalidTransactionEntry(String),
    /// компонент даты вне календарного диапазона или не числовой
    InvalidDate(String),
    /// компонент суммы не числовой после нормализации разделителей
    InvalidAmount(String),
    /// тег 86 встретился без открытой проводки
    OrphanNarrative(String),
    /// строка-продолжение пришла до того, как началось описание
    OrphanContinuation(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Io(e) => write!(f, "io error: {e}"),
            DecodeError::InvalidTagShape(s) => write!(f, "invalid tag shape: {s}"),
            DecodeError::InvalidBalance(s) => write!(f, "invalid balance: {s}"),
            DecodeError::InvalidTransactionEntry(s) => {
                write!(f, "invalid transaction entry: {s}")
            }
            DecodeError::InvalidDate(s) => write!(f, "invalid date: {s}"),
            DecodeError::InvalidAmount(s) => write!(f, "invalid amount: {s}"),
            DecodeError::OrphanNarrative(s) => {
                write!(f, "narrative without an open transaction: {s}")
            }
            DecodeError::OrphanContinuation(s) => {
                write!(f, "continuation before any narrative, dropped: {s}")
            }
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DecodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IoError> for DecodeError {
    fn from(e: IoError) -> Self {
        DecodeError::Io(e)
    }
}

/// Диагностика декодера, привязанная к строке исходного текста.
///
/// Декодер не прерывается на ошибках отдельных полей: каждая такая ошибка
/// попадает сюда, а соответствующее поле выписки остаётся в состоянии
/// "неизвестно".
#[derive(Debug)]
pub struct Diagnostic {
    /// номер строки исходного текста, с единицы
    pub line: usize,
    /// что именно не разобралось
    pub error: DecodeError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}
