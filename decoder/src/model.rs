use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

/// Тип для знаковых денежных величин в "копейках" (минорных единицах валюты)
pub type SignedMinor = i128;

/// Структура с поддерживаемыми валютами
///
/// Важно:
/// При использовании [`Currency::Other`] код валюты сохраняется как есть,
/// без какой-либо проверки по справочнику ISO-4217.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Currency {
    /// Евро
    EUR,
    /// Американский доллар
    USD,
    /// Британский фунт
    GBP,

    /// Любая другая валюта
    ///
    /// Содержится как строка (3 заглавные буквы, как в теге баланса)
    Other(String),
}

impl Currency {
    /// Буквенный код валюты, как он встречается в выписке
    pub fn as_str(&self) -> &str {
        match self {
            Currency::EUR => "EUR",
            Currency::USD => "USD",
            Currency::GBP => "GBP",
            Currency::Other(code) => code,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Направление движения средств (Дебет/Кредит)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    /// Дебет
    Debit,
    /// Кредит
    Credit,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Credit => write!(f, "Credit"),
            Direction::Debit => write!(f, "Debit"),
        }
    }
}

/// Баланс из тегов :60F:/:60M: и :62F:/:62M:
///
/// Сумма всегда неотрицательная, знак несёт [`Direction`].
/// Дата может отсутствовать, если компонент даты в теге не разобрался
/// (при этом сам баланс остаётся пригодным к использованию).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// признак кредит/дебет
    pub direction: Direction,
    /// дата валютирования
    pub date: Option<NaiveDate>,
    /// валюта
    pub currency: Currency,
    /// сумма в "копейках"
    pub amount: u64,
}

impl Balance {
    /// Пустой баланс-заглушка: кредит, без даты, без валюты, ноль.
    ///
    /// Используется только в lenient-режиме как явный fallback при полном
    /// несовпадении формата тега.
    pub fn empty() -> Self {
        Balance {
            direction: Direction::Credit,
            date: None,
            currency: Currency::Other(String::new()),
            amount: 0,
        }
    }

    /// Сумма со знаком: кредит положительный, дебет отрицательный
    pub fn signed_amount(&self) -> SignedMinor {
        match self.direction {
            Direction::Credit => self.amount as SignedMinor,
            Direction::Debit => -(self.amount as SignedMinor),
        }
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date_str = self.date.map(|d| d.to_string()).unwrap_or_default();

        write!(
            f,
            "{:<6} {:<10} {} {}",
            self.direction,
            date_str,
            self.currency,
            format_minor_units(self.amount, ','),
        )
    }
}

/// Одна проводка выписки (:61: плюс накопленный текст из :86: и голых строк).
///
/// `None` в любом поле — это явный маркер "не разобралось", а не ноль:
/// проводка с нечитаемым тегом :61: попадает в выписку со всеми полями
/// `None` и диагностикой, чтобы её было видно, но она не искажала итоги.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// дата валютирования
    pub value_date: Option<NaiveDate>,
    /// направление проводки
    pub direction: Option<Direction>,
    /// денежная сумма (в "копейках")
    pub amount: Option<u64>,
    /// текстовое описание
    pub description: Option<String>,
}

impl Transaction {
    /// Проводка, у которой не разобралось ничего
    pub(crate) fn unknown() -> Self {
        Transaction {
            value_date: None,
            direction: None,
            amount: None,
            description: None,
        }
    }

    /// Legacy-заглушка для lenient-режима: без даты, дебет, ноль
    pub(crate) fn lenient_fallback() -> Self {
        Transaction {
            value_date: None,
            direction: Some(Direction::Debit),
            amount: Some(0),
            description: None,
        }
    }

    /// Дописывает фрагмент описания через пробел.
    ///
    /// Если описания ещё не было, оно становится ровно этим фрагментом.
    pub(crate) fn push_description(&mut self, fragment: &str) {
        match self.description.as_mut() {
            None => self.description = Some(fragment.to_string()),
            Some(desc) => {
                if !desc.is_empty() {
                    desc.push(' ');
                }
                desc.push_str(fragment);
            }
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value_date_str = self.value_date.map(|d| d.to_string()).unwrap_or_default();

        let direction_str = self
            .direction
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string());

        let amount_str = self
            .amount
            .map(|a| format_minor_units(a, ','))
            .unwrap_or_else(|| "?".to_string());

        write!(
            f,
            "{:<10} {:<6} {:>15} {}",
            value_date_str,
            direction_str,
            amount_str,
            self.description.as_deref().unwrap_or(""),
        )
    }
}

/// Центральная/корневая структура библиотеки, содержащая одну банковскую выписку.
///
/// Собирается декодером за один проход и после этого не изменяется.
/// Порядок проводок равен порядку их появления во входном тексте.
///
/// Пример использования:
/// ```no_run
/// use decoder::decode;
///
/// let decoded = decode(":20:REF\n:25:ACC\n");
/// for tx in &decoded.statement.transactions {
///     println!("{tx}");
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statement {
    /// :20: Transaction Reference Number
    pub transaction_reference: Option<String>,
    /// :25: идентификатор счёта (номер счёта/IBAN как есть)
    pub account_id: Option<String>,
    /// :28C: номер/серия выписки, сырой текст, например "49/2"
    pub statement_number: Option<String>,
    /// :60F: / :60M: открывающий баланс
    pub opening_balance: Option<Balance>,
    /// :62F: / :62M: закрывающий баланс
    pub closing_balance: Option<Balance>,
    /// проводки в порядке появления
    pub transactions: Vec<Transaction>,
}

impl Statement {
    /// Сумма всех кредитовых проводок (в "копейках").
    ///
    /// Считается при каждом вызове; проводки с неизвестной суммой
    /// или направлением не участвуют.
    pub fn total_credits(&self) -> u64 {
        self.sum_by_direction(Direction::Credit)
    }

    /// Сумма всех дебетовых проводок (в "копейках")
    pub fn total_debits(&self) -> u64 {
        self.sum_by_direction(Direction::Debit)
    }

    /// Кредиты минус дебеты, со знаком
    pub fn net_movement(&self) -> SignedMinor {
        self.total_credits() as SignedMinor - self.total_debits() as SignedMinor
    }

    fn sum_by_direction(&self, direction: Direction) -> u64 {
        self.transactions
            .iter()
            .filter(|tx| tx.direction == Some(direction))
            .filter_map(|tx| tx.amount)
            .sum()
    }
}

/// Форматирует целочисленное значение суммы (копейки) в человекочитаемый формат
pub fn format_minor_units<T>(value: T, decimal_separator: char) -> String
where
    T: Into<i128>,
{
    let v: i128 = value.into();
    let v = v.unsigned_abs();
    let units = v / 100;
    let frac = v % 100;

    format!("{units}{decimal_separator}{frac:02}")
}
