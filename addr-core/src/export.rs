//! # Exportação dos Campos Padronizados
//!
//! Converte o candidato vencedor (um símbolo de saída por lexema) em campos
//! nomeados de texto.
//!
//! | Slot | Campo      | Símbolos de saída |
//! |------|------------|-------------------|
//! | 0–13 | building … postcode | BLDNG … POSTAL (mesmo índice) |
//! | 14   | box        | BOXH, BOXT        |
//! | 15   | unit       | UNITH, UNITT      |
//!
//! ## Regras de texto
//!
//! - Texto canônico do léxico; definições padrão usam a grafia original.
//! - Um nome de rua que também é ordinal usa a grafia ordinal (`FIRST` → `1ST`).
//! - O número da casa perde zeros à esquerda (`007` → `7`, `000` → `0`).
//! - Lexemas do mesmo campo são unidos por espaço; o campo nunca passa de
//!   [`MAX_FIELD_LEN`] bytes (o excedente é descartado em silêncio).
//! - Caixa postal e unidade sem cabeçalho recebem um rótulo: `BOX 12`, `# 5`.

use serde::{Deserialize, Serialize};

use crate::candidates::Candidate;
use crate::symbols::{InputSymbol, OutputSymbol};
use crate::tokenizer::Lexeme;

pub const FIELD_COUNT: usize = 16;
pub const MAX_FIELD_LEN: usize = 256;
pub const BOX_SLOT: usize = 14;
pub const UNIT_SLOT: usize = 15;

/// Ordem de exibição nas renderizações: caixa, unidade, depois 0..13.
const DISPLAY_ORDER: [usize; FIELD_COUNT] = [14, 15, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13];

/// `(tag XML, rótulo de tela)` por slot.
const FIELD_TAGS: [(&str, &str); FIELD_COUNT] = [
    ("Build", "Building:         "),
    ("Civic", "House Address:    "),
    ("PreDir", "Prefix Direction: "),
    ("Qualif", "Qualifier:        "),
    ("PreTyp", "Prefix Type:      "),
    ("Street", "Street Name:      "),
    ("SufTyp", "Suffix Type:      "),
    ("SufDir", "Suffix Direction: "),
    ("Rural", "Rural Route:      "),
    ("Extra", "Additional Info:  "),
    ("City", "Municipal:        "),
    ("Prov", "Province/State:   "),
    ("Nation", "Country:          "),
    ("Postal", "Postal/Zip Code:  "),
    ("Box", "Box:              "),
    ("Unit", "Unit:             "),
];

/// Tags dos campos reaproveitados por um landmark.
fn landmark_tag(slot: usize) -> Option<(&'static str, &'static str)> {
    match slot {
        0 => Some(("FeatureName", "Feature Name:     ")),
        8 => Some(("FeatureType", "Feature Type:     ")),
        9 => Some(("FeatureArea", "Feature Area:     ")),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationFormat {
    PseudoXml,
    PseudoCsv,
    /// Rótulo e valor, um campo por linha.
    Screen,
    /// Só os valores, um por linha.
    NoFormat,
}

impl SerializationFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "xml" | "pseudo_xml" => Some(Self::PseudoXml),
            "csv" | "pseudo_csv" => Some(Self::PseudoCsv),
            "screen" => Some(Self::Screen),
            "none" | "no_format" | "plain" => Some(Self::NoFormat),
            _ => None,
        }
    }
}

impl Default for SerializationFormat {
    fn default() -> Self {
        SerializationFormat::Screen
    }
}

/// Grupo de campos afetado por uma limpeza ou preenchimento.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    Both,
    /// Lado macro: cidade, estado, país, código postal.
    Right,
    /// Lado micro: tudo o mais, inclusive caixa postal e unidade.
    Left,
}

impl FieldGroup {
    fn contains(self, slot: usize) -> bool {
        match self {
            FieldGroup::Both => true,
            FieldGroup::Right => (10..=13).contains(&slot),
            FieldGroup::Left => !(10..=13).contains(&slot),
        }
    }
}

fn slot_of(symbol: OutputSymbol) -> usize {
    match symbol {
        OutputSymbol::BoxHead | OutputSymbol::BoxTail => BOX_SLOT,
        OutputSymbol::UnitHead | OutputSymbol::UnitTail => UNIT_SLOT,
        other => other.index(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardFields {
    pub building: String,
    pub house_num: String,
    pub predir: String,
    pub qual: String,
    pub pretype: String,
    pub name: String,
    pub suftype: String,
    pub sufdir: String,
    pub ruralroute: String,
    pub extra: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postcode: String,
    #[serde(rename = "box")]
    pub po_box: String,
    pub unit: String,
}

impl StandardFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: usize) -> Option<&str> {
        let value = match slot {
            0 => &self.building,
            1 => &self.house_num,
            2 => &self.predir,
            3 => &self.qual,
            4 => &self.pretype,
            5 => &self.name,
            6 => &self.suftype,
            7 => &self.sufdir,
            8 => &self.ruralroute,
            9 => &self.extra,
            10 => &self.city,
            11 => &self.state,
            12 => &self.country,
            13 => &self.postcode,
            14 => &self.po_box,
            15 => &self.unit,
            _ => return None,
        };
        Some(value)
    }

    fn slot_mut(&mut self, slot: usize) -> Option<&mut String> {
        let value = match slot {
            0 => &mut self.building,
            1 => &mut self.house_num,
            2 => &mut self.predir,
            3 => &mut self.qual,
            4 => &mut self.pretype,
            5 => &mut self.name,
            6 => &mut self.suftype,
            7 => &mut self.sufdir,
            8 => &mut self.ruralroute,
            9 => &mut self.extra,
            10 => &mut self.city,
            11 => &mut self.state,
            12 => &mut self.country,
            13 => &mut self.postcode,
            14 => &mut self.po_box,
            15 => &mut self.unit,
            _ => return None,
        };
        Some(value)
    }

    pub fn is_empty(&self) -> bool {
        (0..FIELD_COUNT).all(|slot| self.get(slot).map_or(true, str::is_empty))
    }

    pub fn clear(&mut self, group: FieldGroup) {
        for slot in (0..FIELD_COUNT).filter(|s| group.contains(*s)) {
            if let Some(value) = self.slot_mut(slot) {
                value.clear();
            }
        }
    }

    /// Preenche os campos do grupo a partir de um candidato, varrendo os
    /// lexemas da esquerda para a direita para cada símbolo de saída.
    pub fn fill(&mut self, lexemes: &[Lexeme], candidate: &Candidate, group: FieldGroup) {
        for symbol in OutputSymbol::all() {
            let slot = slot_of(*symbol);
            if !group.contains(slot) {
                continue;
            }
            for (i, lexeme) in lexemes.iter().enumerate() {
                if candidate.outputs.get(i).copied().flatten() != Some(*symbol) {
                    continue;
                }
                let Some(def_index) = candidate.selection.get(i) else {
                    continue;
                };
                let text = standard_text(lexeme, *def_index, *symbol);
                self.append(slot, &text, *symbol);
            }
        }
    }

    fn append(&mut self, slot: usize, src: &str, symbol: OutputSymbol) {
        let Some(dest) = self.slot_mut(slot) else {
            return;
        };
        if src.len() + dest.len() > MAX_FIELD_LEN {
            return;
        }
        if !dest.is_empty() {
            dest.push(' ');
            dest.push_str(src);
            return;
        }
        match symbol {
            OutputSymbol::UnitTail => dest.push_str("# "),
            OutputSymbol::BoxTail => dest.push_str("BOX "),
            _ => {}
        }
        dest.push_str(src);
    }

    /// Renderiza os campos não vazios em `format`.
    pub fn render(&self, format: SerializationFormat, landmark: bool) -> String {
        let record = if landmark { "landmark" } else { "address" };
        let mut out = String::new();
        if format == SerializationFormat::PseudoXml {
            out.push_str(&format!("   <{}>\n", record));
        }
        for slot in DISPLAY_ORDER {
            let value = match self.get(slot) {
                Some(v) if !v.is_empty() => v,
                _ => continue,
            };
            let (tag, label) = if landmark {
                landmark_tag(slot).unwrap_or(FIELD_TAGS[slot])
            } else {
                FIELD_TAGS[slot]
            };
            match format {
                SerializationFormat::PseudoXml => out.push_str(&format!("    <{}>{}</{}>\n", tag, value, tag)),
                SerializationFormat::PseudoCsv => out.push_str(&format!("\"{}\",", value)),
                SerializationFormat::Screen => out.push_str(&format!("{}{}\n", label, value)),
                SerializationFormat::NoFormat => out.push_str(&format!("{}\n", value)),
            }
        }
        match format {
            SerializationFormat::PseudoXml => out.push_str(&format!("   </{}>\n", record)),
            SerializationFormat::PseudoCsv => out.push('\n'),
            _ => {}
        }
        out
    }
}

/// Texto padronizado de um lexema para o campo `symbol`.
fn standard_text(lexeme: &Lexeme, def_index: usize, symbol: OutputSymbol) -> String {
    let Some(def) = lexeme.definitions.get(def_index) else {
        return lexeme.text.clone();
    };
    // só vale quando a leitura ordinal vem da definição escolhida em diante
    let ordinal_reading = lexeme.definitions[def_index..]
        .iter()
        .any(|d| d.symbol == InputSymbol::Ordinal);
    if symbol == OutputSymbol::Street && def.symbol == InputSymbol::Word && ordinal_reading {
        let ordinal = lexeme
            .definitions
            .iter()
            .find(|d| d.symbol == InputSymbol::Ordinal)
            .and_then(|d| d.standard_text());
        if let Some(text) = ordinal {
            return text.to_string();
        }
    }
    let text = def.standard_text().unwrap_or(&lexeme.text);
    if symbol == OutputSymbol::House {
        return strip_leading_zeros(text);
    }
    text.to_string()
}

fn strip_leading_zeros(text: &str) -> String {
    let stripped = text.trim_start_matches('0');
    if stripped.is_empty() && !text.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}
