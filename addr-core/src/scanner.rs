//! # Varredura de Morfos
//!
//! Primeiro estágio da tokenização: percorre os caracteres e produz morfos
//! (unidades mínimas) e terminadores.
//!
//! | Entrada              | Resultado                               |
//! |----------------------|-----------------------------------------|
//! | `123`                | morfo NUMBER                            |
//! | `21ST`, `4th`        | morfo ordinal (sufixo incluído)         |
//! | `1/2`                | morfo FRACT                             |
//! | `A`, `NW`, `MAIN`    | SINGLE, DOUBLE, WORD (pelo tamanho)     |
//! | `&&`                 | SINGLE                                  |
//! | `,` `;` tab          | terminador forte                        |
//! | espaço `-` `.` ...   | terminador fraco (hífen se começa com -)|
//!
//! Caracteres Latin-1 acentuados são dobrados para ASCII antes da varredura.
//! A varredura para em uma quebra de linha.

use serde::{Deserialize, Serialize};

use crate::lexicon::DefaultKind;

/// Como um morfo se separa do seguinte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminator {
    /// Colado ao próximo morfo (ex: `K` e `1` em `K1A`).
    Open,
    /// Vírgula, ponto e vírgula ou tabulação: nenhuma frase atravessa.
    Hard,
    /// Espaço e afins.
    Soft,
    /// Separador fraco iniciado por hífen (`101-1750`).
    Hyphen,
}

impl Terminator {
    /// Separadores fracos viram espaço ao juntar morfos em uma frase.
    pub fn joins_with_space(self) -> bool {
        matches!(self, Terminator::Soft | Terminator::Hyphen)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanItem {
    Morph { kind: DefaultKind, text: String },
    Break(Terminator),
}

const SPACERS: &[char] = &[' ', '\\', '-', '.', ')', '}', '>', '_'];
const HARD_BREAKS: &[char] = &[',', '\t', ';'];

/// Dobra um caractere Latin-1 acentuado para a letra ASCII correspondente.
pub fn fold_latin1(c: char) -> char {
    match c {
        'À'..='Æ' | 'à'..='æ' => 'A',
        'Ç' | 'ç' => 'C',
        'È'..='Ë' | 'è'..='ë' => 'E',
        'Ì'..='Ï' | 'ì'..='ï' => 'I',
        'Ð' | 'ð' => 'D',
        'Ñ' | 'ñ' => 'N',
        'Ò'..='Ö' | 'ò'..='ö' => 'O',
        'Ù'..='Ü' | 'ù'..='ü' => 'U',
        'Ý' | 'ý' | 'ÿ' => 'Y',
        _ => c,
    }
}

/// Iterador de morfos e terminadores sobre um texto.
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().map(fold_latin1).collect(),
            pos: 0,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, start: usize, pred: F) -> usize {
        let mut end = start;
        while end < self.chars.len() && pred(self.chars[end]) {
            end += 1;
        }
        end
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.chars[start..end]
            .iter()
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    fn scan_digits(&mut self) -> ScanItem {
        let start = self.pos;
        let end = self.take_while(start, |c| c.is_ascii_digit());
        let digits = &self.chars[start..end];
        let last = digits[digits.len() - 1];
        let penult = if digits.len() > 1 { Some(digits[digits.len() - 2]) } else { None };
        let teen = penult == Some('1');
        let a = self.chars.get(end).copied().map(|c| c.to_ascii_uppercase());
        let b = self.chars.get(end + 1).copied().map(|c| c.to_ascii_uppercase());

        let kind = match (a, b) {
            (Some('/'), Some(d)) if is_fraction(last, d) => Some((DefaultKind::Fraction, 2)),
            (Some('S'), Some('T')) if last == '1' && !teen => Some((DefaultKind::Ordinal, 2)),
            (Some('N'), Some('D')) if last == '2' && !teen => Some((DefaultKind::Ordinal, 2)),
            (Some('R'), Some('D')) if last == '3' && !teen => Some((DefaultKind::Ordinal, 2)),
            (Some('T'), Some('H')) if !matches!(last, '1' | '2' | '3') || teen => {
                Some((DefaultKind::Ordinal, 2))
            }
            _ => None,
        };

        let (kind, end) = match kind {
            Some((kind, extra)) => (kind, end + extra),
            None => (DefaultKind::Number, end),
        };
        self.pos = end;
        ScanItem::Morph {
            kind,
            text: self.text(start, end),
        }
    }

    fn scan_letters(&mut self) -> ScanItem {
        let start = self.pos;
        let end = self.take_while(start + 1, |c| c.is_ascii_alphabetic() || c == '\'');
        self.pos = end;
        let kind = match end - start {
            1 => DefaultKind::Single,
            2 => DefaultKind::Double,
            _ => DefaultKind::Word,
        };
        ScanItem::Morph {
            kind,
            text: self.text(start, end),
        }
    }
}

fn is_fraction(numerator: char, denominator: char) -> bool {
    matches!(
        (numerator, denominator),
        ('1', '2') | ('1', '3') | ('2', '3') | ('1', '4') | ('3', '4')
    )
}

impl Iterator for Scanner {
    type Item = ScanItem;

    fn next(&mut self) -> Option<ScanItem> {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                self.pos = self.chars.len();
                return None;
            }
            if c.is_ascii_digit() {
                return Some(self.scan_digits());
            }
            if c.is_ascii_alphabetic() || c == '\'' || c == '#' {
                return Some(self.scan_letters());
            }
            if c == '&' {
                let start = self.pos;
                self.pos = self.take_while(start, |c| c == '&');
                return Some(ScanItem::Morph {
                    kind: DefaultKind::Single,
                    text: self.text(start, self.pos),
                });
            }
            if HARD_BREAKS.contains(&c) {
                self.pos += 1;
                return Some(ScanItem::Break(Terminator::Hard));
            }
            if SPACERS.contains(&c) {
                let start = self.pos;
                self.pos = self.take_while(start, |c| SPACERS.contains(&c));
                let term = if c == '-' { Terminator::Hyphen } else { Terminator::Soft };
                return Some(ScanItem::Break(term));
            }
            // qualquer outro caractere é ignorado
            self.pos += 1;
        }
        None
    }
}
