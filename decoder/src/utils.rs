use crate::error::DecodeError;
use crate::model::Currency;

pub(crate) fn parse_currency(raw: &str) -> Currency {
    let s = raw.trim();

    match s {
        "EUR" => Currency::EUR,
        "USD" => Currency::USD,
        "GBP" => Currency::GBP,

        // Всё остальное — как есть:
        _ => Currency::Other(s.to_string()),
    }
}

/// Разбирает сумму из выписки в "копейки".
///
/// Запятая — десятичный разделитель, точка — (необязательный) разделитель
/// тысяч: "1.234,56" -> 123456. Больше двух знаков после запятой не бывает.
pub(crate) fn parse_amount(raw: &str) -> Result<u64, DecodeError> {
    let cleaned = raw
        .trim()
        .replace(' ', "")
        .replace('.', "")
        .replace(',', ".");

    if cleaned.is_empty() {
        return Err(DecodeError::InvalidAmount("empty amount".into()));
    }
    if cleaned.starts_with('-') {
        return Err(DecodeError::InvalidAmount(format!(
            "negative amount: {cleaned}"
        )));
    }

    let mut split = cleaned.split('.');
    // cleaned точно не пусто, так что ошибки здесь быть не может
    let int_part = split.next().unwrap();
    let dec_part = split.next().unwrap_or("");
    if split.next().is_some() {
        // больше одной запятой — странный формат
        return Err(DecodeError::InvalidAmount(format!(
            "too many decimal separators in amount: {raw}"
        )));
    }

    let int_part: u64 = int_part
        .parse()
        .map_err(|_| DecodeError::InvalidAmount(format!("non-numeric amount: {raw}")))?;

    let dec_part: u64 = match dec_part.len() {
        0 => 0,
        1 => {
            let d = dec_part
                .chars()
                .next()
                .and_then(|c| c.to_digit(10))
                .ok_or_else(|| {
                    DecodeError::InvalidAmount(format!("invalid fractional part: {raw}"))
                })?;
            d as u64 * 10
        }
        2 => dec_part
            .parse()
            .map_err(|_| DecodeError::InvalidAmount(format!("invalid fractional part: {raw}")))?,
        _ => {
            return Err(DecodeError::InvalidAmount(format!(
                "too many fractional digits in amount: {raw}"
            )));
        }
    };

    Ok(int_part * 100 + dec_part)
}
