mod utils;

use crate::error::{DecodeError, Diagnostic};
use crate::model::{Balance, Statement, Transaction};
use std::io::Read;
use std::mem;
use utils::*;

/// Закрытый перечень тегов, которые понимает сборщик.
///
/// Всё, что распознано как тег, но сюда не попало, пропускается молча:
/// незнакомый тег не должен ронять декодирование.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    /// :20: Transaction Reference Number
    TransactionReference,
    /// :25: Account Identification
    AccountId,
    /// :28C: Statement Number/Sequence
    StatementNumber,
    /// :60F: / :60M: Opening Balance
    OpeningBalance,
    /// :62F: / :62M: Closing Balance
    ClosingBalance,
    /// :61: Statement Line
    Entry,
    /// :86: Information to Account Owner
    Narrative,
    /// любой другой тег
    Unrecognized,
}

impl Tag {
    fn from_code(code: &str) -> Self {
        match code {
            "20" => Tag::TransactionReference,
            "25" => Tag::AccountId,
            "28C" => Tag::StatementNumber,
            "60F" | "60M" => Tag::OpeningBalance,
            "62F" | "62M" => Tag::ClosingBalance,
            "61" => Tag::Entry,
            "86" => Tag::Narrative,
            _ => Tag::Unrecognized,
        }
    }
}

/// Настройки декодера
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// При полном несовпадении формата поля подставлять legacy-заглушку
    /// (пустой кредитовый баланс, нулевую дебетовую проводку) вместо
    /// маркера "неизвестно". Диагностика записывается в обоих режимах.
    pub lenient_fields: bool,

    /// Подбирать строки-продолжения, пришедшие после :61:, но до первого
    /// :86:. По умолчанию такие строки отбрасываются — так ведут себя
    /// банковские выгрузки, где между :61: и :86: попадается служебный
    /// текст, не относящийся к описанию.
    pub adopt_bare_continuations: bool,
}

/// Результат декодирования: выписка плюс накопленные диагностики.
///
/// Декодер никогда не прерывается на ошибке отдельного поля, поэтому
/// выписка есть всегда; по диагностикам вызывающая сторона решает,
/// насколько частичному результату можно доверять.
#[derive(Debug)]
pub struct Decoded {
    /// собранная выписка
    pub statement: Statement,
    /// всё, что не разобралось или было отброшено по пути
    pub diagnostics: Vec<Diagnostic>,
}

impl Decoded {
    /// true, если декодирование прошло без единой диагностики
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Декодер MT940.
///
/// Сам по себе состояния не хранит: каждый вызов [`Mt940Decoder::decode`]
/// заводит свежий накопитель, так что один экземпляр можно спокойно
/// использовать из нескольких потоков.
///
/// Пример:
/// ```rust,no_run
/// use decoder::Mt940Decoder;
///
/// let decoder = Mt940Decoder::new();
/// let decoded = decoder.decode(":20:REF\n:25:ACCOUNT\n");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Mt940Decoder {
    options: DecodeOptions,
}

impl Mt940Decoder {
    /// Декодер со строгими настройками по умолчанию
    pub fn new() -> Self {
        Mt940Decoder::default()
    }

    /// Go to [`DecodeOptions`]
    pub fn with_options(options: DecodeOptions) -> Self {
        Mt940Decoder { options }
    }

    /// Декодирует текстовый блоб в [`Decoded`].
    ///
    /// Пустой или состоящий из одних пробелов вход — не ошибка:
    /// получится выписка без полей и без диагностик.
    pub fn decode(&self, input: &str) -> Decoded {
        let lines = normalize_lines(input);

        lines
            .iter()
            .map(|line| (line.number, classify_line(&line.text)))
            .fold(Assembler::new(self.options), |asm, (line_no, kind)| {
                asm.step(line_no, kind)
            })
            .finish()
    }

    /// Читает весь reader в память и декодирует.
    ///
    /// При ошибке чтения возвращает [`DecodeError::Io`]; само
    /// декодирование не фейлится.
    pub fn decode_reader<R: Read>(&self, mut reader: R) -> Result<Decoded, DecodeError> {
        let mut input = String::new();
        reader.read_to_string(&mut input)?;

        Ok(self.decode(&input))
    }
}

/// Декодирует текст с настройками по умолчанию
pub fn decode(input: &str) -> Decoded {
    Mt940Decoder::new().decode(input)
}

/// Состояние накопителя проводки между строками.
///
/// Строка-продолжение значит разное в зависимости от того, открыта ли
/// проводка и началось ли уже описание, поэтому три состояния
/// перечислены явно.
#[derive(Debug)]
enum Pending {
    /// проводка не открыта
    None,
    /// проводка открыта, описание ещё не начиналось
    Bare(Transaction),
    /// проводка открыта, описание накапливается
    Described(Transaction),
}

/// Сборщик выписки: свёртка по распознанным строкам
struct Assembler {
    options: DecodeOptions,
    statement: Statement,
    pending: Pending,
    diagnostics: Vec<Diagnostic>,
}

impl Assembler {
    fn new(options: DecodeOptions) -> Self {
        Assembler {
            options,
            statement: Statement::default(),
            pending: Pending::None,
            diagnostics: Vec::new(),
        }
    }

    fn step(mut self, line_no: usize, kind: LineKind<'_>) -> Self {
        match kind {
            LineKind::Field { tag, content } => {
                self.apply_field(line_no, Tag::from_code(tag), content);
            }
            LineKind::MalformedTag(text) => {
                self.report(line_no, DecodeError::InvalidTagShape(text.to_string()));
                // дальше как обычная строка-продолжение
                self.apply_continuation(line_no, text);
            }
            LineKind::Continuation(text) => {
                self.apply_continuation(line_no, text);
            }
        }

        self
    }

    fn finish(mut self) -> Decoded {
        self.flush_pending();

        Decoded {
            statement: self.statement,
            diagnostics: self.diagnostics,
        }
    }

    fn apply_field(&mut self, line_no: usize, tag: Tag, content: &str) {
        match tag {
            // одиночные поля: последнее вхождение выигрывает
            Tag::TransactionReference => {
                self.statement.transaction_reference = Some(content.to_string());
            }
            Tag::AccountId => {
                self.statement.account_id = Some(content.to_string());
            }
            Tag::StatementNumber => {
                self.statement.statement_number = Some(content.to_string());
            }
            Tag::OpeningBalance => {
                self.statement.opening_balance = self.decode_balance_field(line_no, content);
            }
            Tag::ClosingBalance => {
                self.statement.closing_balance = self.decode_balance_field(line_no, content);
            }
            Tag::Entry => {
                self.flush_pending();

                let txn = match parse_entry(content) {
                    Ok(decoded) => {
                        self.report_components(line_no, decoded.component_errors);
                        decoded.transaction
                    }
                    Err(e) => {
                        self.report(line_no, e);
                        if self.options.lenient_fields {
                            Transaction::lenient_fallback()
                        } else {
                            Transaction::unknown()
                        }
                    }
                };

                self.pending = Pending::Bare(txn);
            }
            Tag::Narrative => match mem::replace(&mut self.pending, Pending::None) {
                Pending::None => {
                    // :86: без :61: — терпим, открываем проводку-заглушку
                    self.report(line_no, DecodeError::OrphanNarrative(content.to_string()));

                    let mut txn = Transaction::unknown();
                    txn.push_description(content);
                    self.pending = Pending::Described(txn);
                }
                Pending::Bare(mut txn) | Pending::Described(mut txn) => {
                    txn.push_description(content);
                    self.pending = Pending::Described(txn);
                }
            },
            Tag::Unrecognized => {
                // прочие теги пропускаем
            }
        }
    }

    fn apply_continuation(&mut self, line_no: usize, text: &str) {
        match mem::replace(&mut self.pending, Pending::None) {
            Pending::Described(mut txn) => {
                txn.push_description(text);
                self.pending = Pending::Described(txn);
            }
            Pending::Bare(mut txn) => {
                if self.options.adopt_bare_continuations {
                    txn.push_description(text);
                    self.pending = Pending::Described(txn);
                } else {
                    // совместимость: до первого :86: описание не начинается
                    self.report(line_no, DecodeError::OrphanContinuation(text.to_string()));
                    self.pending = Pending::Bare(txn);
                }
            }
            Pending::None => {
                self.report(line_no, DecodeError::OrphanContinuation(text.to_string()));
            }
        }
    }

    fn decode_balance_field(&mut self, line_no: usize, content: &str) -> Option<Balance> {
        match parse_balance(content) {
            Ok(decoded) => {
                self.report_components(line_no, decoded.component_errors);
                Some(decoded.balance)
            }
            Err(e) => {
                self.report(line_no, e);
                if self.options.lenient_fields {
                    Some(Balance::empty())
                } else {
                    None
                }
            }
        }
    }

    fn flush_pending(&mut self) {
        match mem::replace(&mut self.pending, Pending::None) {
            Pending::None => {}
            Pending::Bare(txn) | Pending::Described(txn) => {
                self.statement.transactions.push(txn);
            }
        }
    }

    fn report(&mut self, line: usize, error: DecodeError) {
        self.diagnostics.push(Diagnostic { line, error });
    }

    fn report_components(&mut self, line: usize, errors: Vec<DecodeError>) {
        for error in errors {
            self.report(line, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Currency, Direction};
    use chrono::NaiveDate;

    #[test]
    fn decode_reads_basic_statement() {
        let input = "\
:20:REF123
:25:DE11112222333344445555
:28C:1/1
:60F:C230101EUR100,00
:61:2301020102C50,00NTRFREF//BANK
:86:Payment text
:62F:C230103EUR150,00
";

        let decoded = decode(input);
        assert!(decoded.is_clean(), "diagnostics: {:?}", decoded.diagnostics);

        let st = decoded.statement;
        assert_eq!(st.transaction_reference.as_deref(), Some("REF123"));
        assert_eq!(st.account_id.as_deref(), Some("DE11112222333344445555"));
        assert_eq!(st.statement_number.as_deref(), Some("1/1"));

        let opening = st.opening_balance.as_ref().unwrap();
        assert_eq!(opening.direction, Direction::Credit);
        assert_eq!(opening.currency, Currency::EUR);
        assert_eq!(opening.amount, 10000);
        assert_eq!(
            opening.date,
            Some(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
        );

        let closing = st.closing_balance.as_ref().unwrap();
        assert_eq!(closing.amount, 15000);

        assert_eq!(st.transactions.len(), 1);
        let tx = &st.transactions[0];
        assert_eq!(tx.direction, Some(Direction::Credit));
        assert_eq!(tx.amount, Some(5000));
        assert_eq!(tx.description.as_deref(), Some("Payment text"));
    }

    #[test]
    fn decode_produces_one_transaction_per_61_in_input_order() {
        let input = "\
:61:240101D1,00
:86:first
:61:240102C2,00
:86:second
:61:240103D3,00
";

        let st = decode(input).statement;

        assert_eq!(st.transactions.len(), 3);
        assert_eq!(st.transactions[0].description.as_deref(), Some("first"));
        assert_eq!(st.transactions[1].description.as_deref(), Some("second"));
        assert_eq!(st.transactions[2].description, None);
        assert_eq!(st.transactions[2].amount, Some(300));
    }

    #[test]
    fn decode_joins_narrative_and_continuation_lines() {
        let input = "\
:61:240101D1,00
:86:FOO
BAR
";

        let st = decode(input).statement;

        assert_eq!(st.transactions.len(), 1);
        assert_eq!(st.transactions[0].description.as_deref(), Some("FOO BAR"));
    }

    #[test]
    fn decode_appends_repeated_86_to_same_transaction() {
        let input = "\
:61:240101D1,00
:86:PART ONE
:86:PART TWO
";

        let st = decode(input).statement;

        assert_eq!(st.transactions.len(), 1);
        assert_eq!(
            st.transactions[0].description.as_deref(),
            Some("PART ONE PART TWO")
        );
    }

    #[test]
    fn decode_drops_continuation_before_any_narrative() {
        // строка после :61: до первого :86: не попадает в описание —
        // ровно это поведение закреплено, его легко "починить" случайно
        let input = "\
:61:240101D1,00
LOST LINE
:86:KEPT
";

        let decoded = decode(input);
        let st = &decoded.statement;

        assert_eq!(st.transactions.len(), 1);
        assert_eq!(st.transactions[0].description.as_deref(), Some("KEPT"));

        assert_eq!(decoded.diagnostics.len(), 1);
        assert_eq!(decoded.diagnostics[0].line, 2);
        assert!(matches!(
            decoded.diagnostics[0].error,
            DecodeError::OrphanContinuation(_)
        ));
    }

    #[test]
    fn decode_can_adopt_bare_continuations_when_asked() {
        let input = "\
:61:240101D1,00
ADOPTED LINE
:86:MORE
";

        let decoder = Mt940Decoder::with_options(DecodeOptions {
            adopt_bare_continuations: true,
            ..DecodeOptions::default()
        });
        let decoded = decoder.decode(input);

        assert!(decoded.is_clean());
        assert_eq!(
            decoded.statement.transactions[0].description.as_deref(),
            Some("ADOPTED LINE MORE")
        );
    }

    #[test]
    fn decode_tolerates_orphan_86_as_placeholder_transaction() {
        let input = ":86:NO ENTRY BEFORE ME\n";

        let decoded = decode(input);
        let st = &decoded.statement;

        assert_eq!(st.transactions.len(), 1);
        let tx = &st.transactions[0];
        assert_eq!(tx.value_date, None);
        assert_eq!(tx.direction, None);
        assert_eq!(tx.amount, None);
        assert_eq!(tx.description.as_deref(), Some("NO ENTRY BEFORE ME"));

        assert!(matches!(
            decoded.diagnostics[0].error,
            DecodeError::OrphanNarrative(_)
        ));
    }

    #[test]
    fn decode_drops_continuation_with_no_open_transaction() {
        let decoded = decode("JUST SOME TEXT\n:20:REF\n");

        assert_eq!(decoded.statement.transactions.len(), 0);
        assert_eq!(
            decoded.statement.transaction_reference.as_deref(),
            Some("REF")
        );
        assert!(matches!(
            decoded.diagnostics[0].error,
            DecodeError::OrphanContinuation(_)
        ));
    }

    #[test]
    fn decode_flushes_open_transaction_at_end_of_input() {
        let st = decode(":61:240101C7,77\n").statement;

        assert_eq!(st.transactions.len(), 1);
        assert_eq!(st.transactions[0].amount, Some(777));
    }

    #[test]
    fn decode_malformed_balance_leaves_field_unknown_in_strict_mode() {
        let decoded = decode(":60F:GARBAGE\n");

        assert_eq!(decoded.statement.opening_balance, None);
        assert_eq!(decoded.diagnostics.len(), 1);
        assert!(matches!(
            decoded.diagnostics[0].error,
            DecodeError::InvalidBalance(_)
        ));
    }

    #[test]
    fn decode_malformed_balance_falls_back_to_empty_in_lenient_mode() {
        let decoder = Mt940Decoder::with_options(DecodeOptions {
            lenient_fields: true,
            ..DecodeOptions::default()
        });
        let decoded = decoder.decode(":60F:GARBAGE\n");

        assert_eq!(decoded.statement.opening_balance, Some(Balance::empty()));
        // диагностика записывается и в lenient-режиме
        assert!(matches!(
            decoded.diagnostics[0].error,
            DecodeError::InvalidBalance(_)
        ));
    }

    #[test]
    fn decode_malformed_61_opens_unknown_transaction_in_strict_mode() {
        let input = "\
:61:NOT A STATEMENT LINE
:86:DESC SURVIVES
";

        let decoded = decode(input);
        let tx = &decoded.statement.transactions[0];

        assert_eq!(tx.value_date, None);
        assert_eq!(tx.direction, None);
        assert_eq!(tx.amount, None);
        assert_eq!(tx.description.as_deref(), Some("DESC SURVIVES"));
        assert!(matches!(
            decoded.diagnostics[0].error,
            DecodeError::InvalidTransactionEntry(_)
        ));
    }

    #[test]
    fn decode_malformed_61_falls_back_to_zero_debit_in_lenient_mode() {
        let decoder = Mt940Decoder::with_options(DecodeOptions {
            lenient_fields: true,
            ..DecodeOptions::default()
        });
        let decoded = decoder.decode(":61:NOT A STATEMENT LINE\n");

        let tx = &decoded.statement.transactions[0];
        assert_eq!(tx.direction, Some(Direction::Debit));
        assert_eq!(tx.amount, Some(0));
        assert_eq!(tx.value_date, None);
    }

    #[test]
    fn decode_repeated_singleton_tags_last_write_wins() {
        let input = "\
:20:FIRST
:20:SECOND
:60F:C230101EUR1,00
:60M:C230102EUR2,00
";

        let st = decode(input).statement;

        assert_eq!(st.transaction_reference.as_deref(), Some("SECOND"));
        assert_eq!(st.opening_balance.as_ref().unwrap().amount, 200);
    }

    #[test]
    fn decode_skips_unrecognized_tags_without_diagnostics() {
        // :64: и :90D: — корректные по форме, но неподдерживаемые теги;
        // они не должны ни ронять декодирование, ни попадать в выписку
        let input = "\
:20:REF
:64:C230101EUR999,99
:90D:75000,00
";

        let decoded = decode(input);

        assert!(decoded.is_clean(), "diagnostics: {:?}", decoded.diagnostics);
        assert_eq!(
            decoded.statement.transaction_reference.as_deref(),
            Some("REF")
        );
        assert_eq!(decoded.statement.closing_balance, None);
    }

    #[test]
    fn decode_malformed_tag_line_continues_open_narrative() {
        let input = "\
:61:240101D1,00
:86:HEAD
:2X1:TAIL
";

        let decoded = decode(input);

        assert_eq!(
            decoded.statement.transactions[0].description.as_deref(),
            Some("HEAD :2X1:TAIL")
        );
        assert!(matches!(
            decoded.diagnostics[0].error,
            DecodeError::InvalidTagShape(_)
        ));
    }

    #[test]
    fn decode_of_empty_input_yields_empty_statement_without_diagnostics() {
        for input in ["", "   ", "\r\n\r\n", " \n \n "] {
            let decoded = decode(input);

            assert!(decoded.is_clean());
            assert_eq!(decoded.statement, Statement::default());
        }
    }

    #[test]
    fn decode_is_idempotent() {
        let input = "\
:20:REF123
:25:ACC
:60F:C230101EUR100,00
:61:2301020102C50,00NTRF
:86:Payment
trailing line
:62F:C230103EUR150,00
";

        let first = decode(input);
        let second = decode(input);

        assert_eq!(first.statement, second.statement);
        assert_eq!(first.diagnostics.len(), second.diagnostics.len());
    }

    #[test]
    fn assembler_accepts_recognized_lines_directly() {
        // сборщик можно кормить готовыми (тег, содержимое) парами,
        // минуя нормализатор и распознавание тегов
        let lines = [
            (
                1,
                LineKind::Field {
                    tag: "20",
                    content: "REF",
                },
            ),
            (
                2,
                LineKind::Field {
                    tag: "61",
                    content: "240101C1,00",
                },
            ),
            (
                3,
                LineKind::Field {
                    tag: "86",
                    content: "DIRECT",
                },
            ),
            (4, LineKind::Continuation("FEED")),
        ];

        let decoded = lines
            .into_iter()
            .fold(
                Assembler::new(DecodeOptions::default()),
                |asm, (line_no, kind)| asm.step(line_no, kind),
            )
            .finish();

        assert!(decoded.is_clean());
        assert_eq!(
            decoded.statement.transactions[0].description.as_deref(),
            Some("DIRECT FEED")
        );
    }

    #[test]
    fn decode_reader_wraps_io() {
        use std::io::Cursor;

        let decoded = Mt940Decoder::new()
            .decode_reader(Cursor::new(b":20:REF\n".to_vec()))
            .unwrap();

        assert_eq!(
            decoded.statement.transaction_reference.as_deref(),
            Some("REF")
        );
    }
}
