//! # Configuração do Padronizador
//!
//! Opções por instância, carregáveis de JSON. Todos os campos têm padrão, então
//! um objeto vazio (`{}`) é uma configuração válida.
//!
//! ```json
//! {
//!   "collect_statistics": true,
//!   "analyze_complete": false,
//!   "reference_attributes": ["PRE_DIRECTION", "SUF_TYPE"],
//!   "format": "pseudo_xml"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::export::SerializationFormat;
use crate::symbols::OutputSymbol;

/// Opções de um [`Standardizer`](crate::pipeline::Standardizer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardizerConfig {
    /// Liga os contadores de uso (hits/best) de cada regra.
    pub collect_statistics: bool,
    /// Percorre todas as composições mesmo depois de um candidato excelente.
    pub analyze_complete: bool,
    /// Campos que o fallback de logradouro pode atribuir nas pontas da linha
    /// (PREDIR, PRETYP, SUFTYP, SUFDIR).
    pub reference_attributes: Vec<OutputSymbol>,
    /// Formato da renderização textual.
    pub format: SerializationFormat,
}

impl StandardizerConfig {
    pub fn new() -> Self {
        Self {
            collect_statistics: false,
            analyze_complete: false,
            reference_attributes: Vec::new(),
            format: SerializationFormat::Screen,
        }
    }

    /// Lê a configuração de um objeto JSON; campos ausentes ficam no padrão.
    ///
    /// # Erros
    /// [`BuildError::Config`] com a mensagem do `serde_json`.
    pub fn from_json(source: &str) -> Result<Self, BuildError> {
        serde_json::from_str(source).map_err(|e| BuildError::Config(e.to_string()))
    }

    /// O fallback de logradouro pode usar `symbol`?
    pub fn has_reference_attribute(&self, symbol: OutputSymbol) -> bool {
        self.reference_attributes.contains(&symbol)
    }
}

impl Default for StandardizerConfig {
    fn default() -> Self {
        Self::new()
    }
}
