//! Difficulty levels and system prompt composition

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Pedagogical rules shared by every level
pub const DEFAULT_PREAMBLE: &str = "Você é um tutor especializado em ensinar computação para pessoas com TEA. \
Use frases curtas, claras e nunca dê a resposta direta. \
Sempre induza o raciocínio. Responda até 3 frases e no máximo 600 caracteres.";

const DEFAULT_BEGINNER: &str = "Nível inicial: fale apenas de lógica básica, sequência de passos, \
variáveis e tipos simples. Use exemplos do dia a dia e evite termos técnicos sem explicação.";

const DEFAULT_INTERMEDIATE: &str = "Nível intermediário: trabalhe condicionais, laços de repetição, \
funções e listas. Peça que o aluno preveja o resultado de pequenos trechos de código.";

const DEFAULT_ADVANCED: &str = "Nível avançado: aborde estruturas de dados, recursão, \
complexidade de algoritmos e organização de programas maiores. Estimule o aluno a justificar escolhas.";

/// Difficulty level of the tutoring session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    /// All levels, easiest first
    pub const ALL: [Self; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Beginner => "Inicial",
            Self::Intermediate => "Intermediário",
            Self::Advanced => "Avançado",
        };
        f.write_str(name)
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "inicial" => Ok(Self::Beginner),
            "intermediate" | "intermediario" | "intermediário" => Ok(Self::Intermediate),
            "advanced" | "avancado" | "avançado" => Ok(Self::Advanced),
            other => Err(Error::Config(format!("unknown level: {other}"))),
        }
    }
}

/// Instruction texts used to build the system message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorPrompts {
    pub preamble: String,
    pub beginner: String,
    pub intermediate: String,
    pub advanced: String,
}

impl Default for TutorPrompts {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.to_string(),
            beginner: DEFAULT_BEGINNER.to_string(),
            intermediate: DEFAULT_INTERMEDIATE.to_string(),
            advanced: DEFAULT_ADVANCED.to_string(),
        }
    }
}

impl TutorPrompts {
    /// Topic constraints for a level
    #[must_use]
    pub fn level_text(&self, level: Level) -> &str {
        match level {
            Level::Beginner => &self.beginner,
            Level::Intermediate => &self.intermediate,
            Level::Advanced => &self.advanced,
        }
    }

    /// Full system instruction for a level: preamble, blank line, level text
    #[must_use]
    pub fn system_prompt(&self, level: Level) -> String {
        let level_text = self.level_text(level);
        if level_text.is_empty() {
            return self.preamble.clone();
        }
        format!("{}\n\n{level_text}", self.preamble)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_english_and_portuguese_names() {
        assert_eq!("beginner".parse::<Level>().unwrap(), Level::Beginner);
        assert_eq!("Avançado".parse::<Level>().unwrap(), Level::Advanced);
        assert_eq!(" INTERMEDIATE ".parse::<Level>().unwrap(), Level::Intermediate);
        assert!("expert".parse::<Level>().is_err());
    }

    #[test]
    fn system_prompt_is_deterministic_per_level() {
        let prompts = TutorPrompts::default();
        for level in Level::ALL {
            assert_eq!(prompts.system_prompt(level), prompts.system_prompt(level));
            assert!(prompts.system_prompt(level).starts_with(DEFAULT_PREAMBLE));
        }
        assert_ne!(
            prompts.system_prompt(Level::Beginner),
            prompts.system_prompt(Level::Advanced)
        );
    }

    #[test]
    fn empty_level_text_yields_preamble_only() {
        let prompts = TutorPrompts {
            beginner: String::new(),
            ..TutorPrompts::default()
        };
        assert_eq!(prompts.system_prompt(Level::Beginner), DEFAULT_PREAMBLE);
    }
}
