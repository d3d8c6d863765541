use crate::error::DecodeError;
use crate::model::{Balance, Direction, Transaction};
use crate::utils::{parse_amount, parse_currency};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    // ^:(\d{2}[A-Z]?): - тег из двух цифр и необязательной заглавной буквы
    // (.*)$ - содержимое до конца строки
    Regex::new(r"^:(\d{2}[A-Z]?):(.*)$").unwrap()
});

static BALANCE_RE: Lazy<Regex> = Lazy::new(|| {
    // [C|D][YYMMDD][валюта][сумма], например C251103USD0,00
    Regex::new(r"^([CD])(\d{6})([A-Z]{3})([0-9,\.]+)$").unwrap()
});

static ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    // :61:YYMMDD[MMDD][funds-коды C/D][C|D][сумма][хвост игнорируется]
    // знаком считается последний C/D непосредственно перед суммой
    Regex::new(r"^(\d{6})(?:\d{4})?[CD]*([CD])([0-9,\.]+).*$").unwrap()
});

/// Строка входного текста после нормализации
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SourceLine {
    /// номер физической строки исходного текста, с единицы
    pub number: usize,
    /// содержимое без окружающих пробелов
    pub text: String,
}

/// Приводит сырой текст к последовательности непустых строк.
///
/// CR, LF и CRLF считаются равноправными границами строк; каждая строка
/// триммится, пустые выбрасываются. Номера физических строк сохраняются
/// для диагностик.
pub(super) fn normalize_lines(input: &str) -> Vec<SourceLine> {
    let unified = input.replace("\r\n", "\n").replace('\r', "\n");

    unified
        .split('\n')
        .enumerate()
        .filter_map(|(idx, raw)| {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(SourceLine {
                    number: idx + 1,
                    text: trimmed.to_string(),
                })
            }
        })
        .collect()
}

/// Результат распознавания одной строки
#[derive(Debug, PartialEq, Eq)]
pub(super) enum LineKind<'a> {
    /// новое поле :tag:content, содержимое уже без окружающих пробелов
    Field { tag: &'a str, content: &'a str },
    /// строка-продолжение последнего открытого поля
    Continuation(&'a str),
    /// похоже на тег, но тело тега не по формату :NN[X]:
    MalformedTag(&'a str),
}

pub(super) fn classify_line(line: &str) -> LineKind<'_> {
    if let Some(caps) = TAG_RE.captures(line) {
        let tag = caps.get(1).unwrap().as_str();
        let content = caps.get(2).unwrap().as_str().trim();
        return LineKind::Field { tag, content };
    }

    if line.starts_with(':') && line[1..].contains(':') {
        return LineKind::MalformedTag(line);
    }

    LineKind::Continuation(line)
}

pub(super) fn parse_yy_mm_dd(s: &str) -> Result<NaiveDate, DecodeError> {
    if s.len() != 6 {
        return Err(DecodeError::InvalidDate(format!("invalid YYMMDD date: '{s}'")));
    }

    let yy: i32 = s[0..2]
        .parse()
        .map_err(|_| DecodeError::InvalidDate(format!("invalid year in YYMMDD: '{s}'")))?;
    let mm: u32 = s[2..4]
        .parse()
        .map_err(|_| DecodeError::InvalidDate(format!("invalid month in YYMMDD: '{s}'")))?;
    let dd: u32 = s[4..6]
        .parse()
        .map_err(|_| DecodeError::InvalidDate(format!("invalid day in YYMMDD: '{s}'")))?;

    // простое допущение: все даты в 2000-х
    let year = 2000 + yy;

    NaiveDate::from_ymd_opt(year, mm, dd)
        .ok_or_else(|| DecodeError::InvalidDate(format!("invalid YYMMDD date components: '{s}'")))
}

/// Баланс плюс ошибки отдельных компонентов (дата, сумма), если были
#[derive(Debug)]
pub(super) struct DecodedBalance {
    pub balance: Balance,
    pub component_errors: Vec<DecodeError>,
}

/// Разбирает содержимое тега :60x:/:62x:.
///
/// Err возвращается только при полном несовпадении формата. Если формат
/// совпал, но не читается дата или сумма, баланс всё равно собирается:
/// дата становится `None`, сумма нулём, а ошибки компонентов
/// возвращаются рядом.
pub(super) fn parse_balance(content: &str) -> Result<DecodedBalance, DecodeError> {
    let caps = BALANCE_RE.captures(content).ok_or_else(|| {
        DecodeError::InvalidBalance(format!(
            "balance does not match [C|D]YYMMDDCCYAMOUNT: '{content}'"
        ))
    })?;

    let direction = match &caps[1] {
        "C" => Direction::Credit,
        _ => Direction::Debit,
    };

    let mut component_errors = Vec::new();

    let date = match parse_yy_mm_dd(&caps[2]) {
        Ok(d) => Some(d),
        Err(e) => {
            component_errors.push(e);
            None
        }
    };

    let currency = parse_currency(&caps[3]);

    let amount = match parse_amount(&caps[4]) {
        Ok(a) => a,
        Err(e) => {
            component_errors.push(e);
            0
        }
    };

    Ok(DecodedBalance {
        balance: Balance {
            direction,
            date,
            currency,
            amount,
        },
        component_errors,
    })
}

/// Проводка из :61: плюс ошибки отдельных компонентов
#[derive(Debug)]
pub(super) struct DecodedEntry {
    pub transaction: Transaction,
    pub component_errors: Vec<DecodeError>,
}

/// Разбирает содержимое тега :61:.
///
/// Терпимо относится к необязательной 4-значной entry date и к нескольким
/// funds-кодам подряд (например, маркерам сторно): знаком считается
/// последний C/D прямо перед суммой. Хвост после суммы (тип операции,
/// референсы) здесь не разбирается — описание проводки приходит из :86:.
pub(super) fn parse_entry(content: &str) -> Result<DecodedEntry, DecodeError> {
    let caps = ENTRY_RE.captures(content).ok_or_else(|| {
        DecodeError::InvalidTransactionEntry(format!(
            "statement line does not match :61: shape: '{content}'"
        ))
    })?;

    let mut component_errors = Vec::new();

    let value_date = match parse_yy_mm_dd(&caps[1]) {
        Ok(d) => Some(d),
        Err(e) => {
            component_errors.push(e);
            None
        }
    };

    let direction = match &caps[2] {
        "C" => Direction::Credit,
        _ => Direction::Debit,
    };

    let amount = match parse_amount(&caps[3]) {
        Ok(a) => Some(a),
        Err(e) => {
            component_errors.push(e);
            Some(0)
        }
    };

    Ok(DecodedEntry {
        transaction: Transaction {
            value_date,
            direction: Some(direction),
            amount,
            description: None,
        },
        component_errors,
    })
}
