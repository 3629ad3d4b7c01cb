//! Recognized C++ language standards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language-standard tag accepted on the command line, handed to the
/// compiler, and echoed back in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Standard {
    #[serde(rename = "c++98")]
    Cpp98,
    #[serde(rename = "c++11")]
    Cpp11,
    #[serde(rename = "c++14")]
    Cpp14,
    #[serde(rename = "c++17")]
    Cpp17,
    #[serde(rename = "c++20")]
    Cpp20,
}

impl Standard {
    pub fn as_str(&self) -> &'static str {
        match self {
            Standard::Cpp98 => "c++98",
            Standard::Cpp11 => "c++11",
            Standard::Cpp14 => "c++14",
            Standard::Cpp17 => "c++17",
            Standard::Cpp20 => "c++20",
        }
    }

    /// `-std=` argument handed to the compiler.
    pub fn compiler_flag(&self) -> String {
        format!("-std={}", self.as_str())
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Standard {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c++98" => Ok(Standard::Cpp98),
            "c++11" => Ok(Standard::Cpp11),
            "c++14" => Ok(Standard::Cpp14),
            "c++17" => Ok(Standard::Cpp17),
            "c++20" => Ok(Standard::Cpp20),
            other => Err(anyhow::anyhow!("unsupported language standard: {}", other)),
        }
    }
}
