//! # Símbolos de Entrada, Símbolos de Saída e Tipos de Cláusula
//!
//! Toda a gramática de padronização é escrita sobre dois alfabetos pequenos e
//! disjuntos:
//!
//! - **Símbolos de entrada** ([`InputSymbol`]): a categoria lexical de um lexema
//!   (número, palavra, tipo de via, direção, código postal...). São os símbolos
//!   que o autômato Gamma consome.
//! - **Símbolos de saída** ([`OutputSymbol`]): o campo de destino atribuído a
//!   cada lexema (número da casa, nome da rua, cidade...).
//!
//! Os códigos numéricos abaixo são a forma "de fio" usada nos arquivos de regras
//! e de léxico e não devem ser renumerados.
//!
//! | Código | Entrada   | Saída    |
//! |--------|-----------|----------|
//! | 0      | NUMBER    | BLDNG    |
//! | 1      | WORD      | HOUSE    |
//! | 2      | TYPE      | PREDIR   |
//! | 5      | STREET    | STREET   |
//! | 10     | CITY      | CITY     |
//! | 13     | AMPERS    | POSTAL   |
//! | 27     | PCH       | -        |
//!
//! ## Pesos
//!
//! Cada regra carrega um *rank* (0..17) que indexa [`LOAD_VALUES`]; o valor de
//! um segmento é `load(rank) * peso(tipo_de_cláusula)`.

use serde::{Deserialize, Serialize};

/// Número de ranks de peso aceitos por uma regra.
pub const RANK_COUNT: usize = 18;

/// Valor de carga de cada rank.
pub const LOAD_VALUES: [f64; RANK_COUNT] = [
    0.00, 0.325, 0.35, 0.375, 0.4, 0.475, 0.55, 0.6, 0.65, 0.675, 0.7, 0.75, 0.8, 0.825, 0.85,
    0.9, 0.95, 1.00,
];

/// Rank usado para composições "ruins" no modo landmark.
pub const LOW_RANK: u8 = 3;
/// Rank usado para composições "excelentes" e como limiar de saída antecipada.
pub const EXCELLENT_RANK: u8 = 16;

/// Valor de carga de um rank (ranks fora da faixa valem zero).
pub fn load_value(rank: u8) -> f64 {
    LOAD_VALUES.get(rank as usize).copied().unwrap_or(0.0)
}

/// Categoria lexical de um lexema (alfabeto do autômato).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputSymbol {
    Number,
    Word,
    Type,
    Qualifier,
    PreType,
    Street,
    Road,
    Stopword,
    RuralRoute,
    Dash,
    City,
    Province,
    Nation,
    Ampersand,
    BoxHead,
    Ordinal,
    UnitHead,
    UnitTail,
    Single,
    BuildingHead,
    Mile,
    Double,
    Direction,
    Mixed,
    BuildingTail,
    Fraction,
    PostalTail,
    PostalHead,
    ZipHead,
    ZipTail,
}

impl InputSymbol {
    pub const COUNT: usize = 30;

    const ALL: [InputSymbol; InputSymbol::COUNT] = [
        InputSymbol::Number,
        InputSymbol::Word,
        InputSymbol::Type,
        InputSymbol::Qualifier,
        InputSymbol::PreType,
        InputSymbol::Street,
        InputSymbol::Road,
        InputSymbol::Stopword,
        InputSymbol::RuralRoute,
        InputSymbol::Dash,
        InputSymbol::City,
        InputSymbol::Province,
        InputSymbol::Nation,
        InputSymbol::Ampersand,
        InputSymbol::BoxHead,
        InputSymbol::Ordinal,
        InputSymbol::UnitHead,
        InputSymbol::UnitTail,
        InputSymbol::Single,
        InputSymbol::BuildingHead,
        InputSymbol::Mile,
        InputSymbol::Double,
        InputSymbol::Direction,
        InputSymbol::Mixed,
        InputSymbol::BuildingTail,
        InputSymbol::Fraction,
        InputSymbol::PostalTail,
        InputSymbol::PostalHead,
        InputSymbol::ZipHead,
        InputSymbol::ZipTail,
    ];

    /// Todos os símbolos, na ordem dos códigos.
    pub fn all() -> &'static [InputSymbol] {
        &Self::ALL
    }

    /// Código numérico (coluna na tabela de transição).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Converte um código de fio; `None` fora da faixa.
    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Nome curto usado em relatórios e listagens de depuração.
    pub fn label(self) -> &'static str {
        match self {
            InputSymbol::Number => "NUMBER",
            InputSymbol::Word => "WORD",
            InputSymbol::Type => "TYPE",
            InputSymbol::Qualifier => "QUALIF",
            InputSymbol::PreType => "PRETYP",
            InputSymbol::Street => "STREET",
            InputSymbol::Road => "ROAD",
            InputSymbol::Stopword => "STOPWORD",
            InputSymbol::RuralRoute => "RR",
            InputSymbol::Dash => "DASH",
            InputSymbol::City => "CITY",
            InputSymbol::Province => "PROV",
            InputSymbol::Nation => "NATION",
            InputSymbol::Ampersand => "AMPERS",
            InputSymbol::BoxHead => "BOXH",
            InputSymbol::Ordinal => "ORD",
            InputSymbol::UnitHead => "UNITH",
            InputSymbol::UnitTail => "UNITT",
            InputSymbol::Single => "SINGLE",
            InputSymbol::BuildingHead => "BUILDH",
            InputSymbol::Mile => "MILE",
            InputSymbol::Double => "DOUBLE",
            InputSymbol::Direction => "DIRECT",
            InputSymbol::Mixed => "MIXED",
            InputSymbol::BuildingTail => "BUILDT",
            InputSymbol::Fraction => "FRACT",
            InputSymbol::PostalTail => "PCT",
            InputSymbol::PostalHead => "PCH",
            InputSymbol::ZipHead => "QUINT",
            InputSymbol::ZipTail => "QUAD",
        }
    }
}

/// Campo de destino atribuído a um lexema pela gramática.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputSymbol {
    Building,
    House,
    PreDirection,
    Qualifier,
    PreType,
    Street,
    SufType,
    SufDirection,
    RuralRoute,
    Extra,
    City,
    Province,
    Nation,
    Postal,
    BoxHead,
    BoxTail,
    UnitHead,
    UnitTail,
}

impl OutputSymbol {
    pub const COUNT: usize = 18;

    const ALL: [OutputSymbol; OutputSymbol::COUNT] = [
        OutputSymbol::Building,
        OutputSymbol::House,
        OutputSymbol::PreDirection,
        OutputSymbol::Qualifier,
        OutputSymbol::PreType,
        OutputSymbol::Street,
        OutputSymbol::SufType,
        OutputSymbol::SufDirection,
        OutputSymbol::RuralRoute,
        OutputSymbol::Extra,
        OutputSymbol::City,
        OutputSymbol::Province,
        OutputSymbol::Nation,
        OutputSymbol::Postal,
        OutputSymbol::BoxHead,
        OutputSymbol::BoxTail,
        OutputSymbol::UnitHead,
        OutputSymbol::UnitTail,
    ];

    pub fn all() -> &'static [OutputSymbol] {
        &Self::ALL
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputSymbol::Building => "BLDNG",
            OutputSymbol::House => "HOUSE",
            OutputSymbol::PreDirection => "PREDIR",
            OutputSymbol::Qualifier => "QUALIF",
            OutputSymbol::PreType => "PRETYP",
            OutputSymbol::Street => "STREET",
            OutputSymbol::SufType => "SUFTYP",
            OutputSymbol::SufDirection => "SUFDIR",
            OutputSymbol::RuralRoute => "RR",
            OutputSymbol::Extra => "EXTRA",
            OutputSymbol::City => "CITY",
            OutputSymbol::Province => "PROV",
            OutputSymbol::Nation => "NATION",
            OutputSymbol::Postal => "POSTAL",
            OutputSymbol::BoxHead => "BOXH",
            OutputSymbol::BoxTail => "BOXT",
            OutputSymbol::UnitHead => "UNITH",
            OutputSymbol::UnitTail => "UNITT",
        }
    }

    /// Campos do lado "macro" (cidade, estado, país, código postal).
    pub fn is_macro(self) -> bool {
        matches!(
            self,
            OutputSymbol::City | OutputSymbol::Province | OutputSymbol::Nation | OutputSymbol::Postal
        )
    }
}

/// Categoria de regra: governa em que contexto gramatical a regra se aplica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseType {
    /// Cidade/estado/país/código postal.
    Macro,
    /// Linha de endereço completa em uma única regra.
    Micro,
    /// Trecho de logradouro (rua, tipo, direções).
    Arc,
    /// Número da casa.
    Civic,
    /// Informação adicional (unidade, caixa postal, rota rural).
    Extra,
}

impl ClauseType {
    pub const COUNT: usize = 5;

    const ALL: [ClauseType; ClauseType::COUNT] = [
        ClauseType::Macro,
        ClauseType::Micro,
        ClauseType::Arc,
        ClauseType::Civic,
        ClauseType::Extra,
    ];

    pub fn all() -> &'static [ClauseType] {
        &Self::ALL
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Peso multiplicado ao valor de carga de cada segmento desta cláusula.
    pub fn weight(self) -> f64 {
        match self {
            ClauseType::Macro => 1.0,
            ClauseType::Micro => 0.95,
            ClauseType::Arc => 0.95,
            ClauseType::Civic => 0.8,
            ClauseType::Extra => 0.85,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClauseType::Macro => "MACRO",
            ClauseType::Micro => "MICRO",
            ClauseType::Arc => "ARC",
            ClauseType::Civic => "CIVIC",
            ClauseType::Extra => "EXTRA",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_codes_roundtrip() {
        for (i, sym) in InputSymbol::all().iter().enumerate() {
            assert_eq!(sym.index(), i);
            assert_eq!(InputSymbol::from_code(i as i32), Some(*sym));
        }
        assert_eq!(InputSymbol::from_code(30), None);
        assert_eq!(InputSymbol::from_code(-1), None);
        assert_eq!(InputSymbol::PostalHead.index(), 27);
        assert_eq!(InputSymbol::ZipTail.label(), "QUAD");
    }

    #[test]
    fn test_output_codes() {
        assert_eq!(OutputSymbol::all().len(), OutputSymbol::COUNT);
        assert_eq!(OutputSymbol::from_code(13), Some(OutputSymbol::Postal));
        assert_eq!(OutputSymbol::from_code(18), None);
        assert!(OutputSymbol::City.is_macro());
        assert!(!OutputSymbol::BoxHead.is_macro());
    }

    #[test]
    fn test_load_values_are_monotonic() {
        for pair in LOAD_VALUES.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(load_value(EXCELLENT_RANK), 0.95);
        assert_eq!(load_value(LOW_RANK), 0.375);
        assert_eq!(load_value(40), 0.0);
    }

    #[test]
    fn test_clause_weights() {
        assert_eq!(ClauseType::Civic.weight(), 0.8);
        assert_eq!(ClauseType::from_code(4), Some(ClauseType::Extra));
        assert_eq!(ClauseType::from_code(5), None);
    }
}
