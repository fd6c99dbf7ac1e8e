use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::charset::Encoding;
use crate::consts::DEFAULT_NATIVE_MAX_LENGTH;
use crate::engine::NodeSpec;
use crate::error::{MaskError, MaskResult};
use crate::session::MaskOptions;

/// Everything that defines a mask run, settable from the command line or a
/// JSON file. Command-line values win over the file when both are given.
#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    #[arg(short = 'm', long = "mask", default_value = "?a?a?a?a")]
    pub pattern: String,

    #[arg(short = '1', long = "custom-1")]
    pub custom_1: Option<String>,
    #[arg(short = '2', long = "custom-2")]
    pub custom_2: Option<String>,
    #[arg(short = '3', long = "custom-3")]
    pub custom_3: Option<String>,
    #[arg(short = '4', long = "custom-4")]
    pub custom_4: Option<String>,
    #[arg(short = '5', long = "custom-5")]
    pub custom_5: Option<String>,
    #[arg(short = '6', long = "custom-6")]
    pub custom_6: Option<String>,
    #[arg(short = '7', long = "custom-7")]
    pub custom_7: Option<String>,
    #[arg(short = '8', long = "custom-8")]
    pub custom_8: Option<String>,
    #[arg(short = '9', long = "custom-9")]
    pub custom_9: Option<String>,

    /// Internal codepage candidates are generated in.
    #[arg(long, default_value_t = Encoding::Ascii)]
    pub encoding: Encoding,

    /// The consumer ignores case, so upper-case classes fold to lower case.
    #[arg(long, default_value_t = false)]
    pub case_insensitive: bool,

    #[arg(long)]
    pub min_length: Option<usize>,
    #[arg(long)]
    pub max_length: Option<usize>,

    #[arg(long, default_value_t = 0)]
    pub native_min_length: usize,
    #[arg(long, default_value_t = DEFAULT_NATIVE_MAX_LENGTH)]
    pub native_max_length: usize,

    /// Node range of a static partition, `N/T` or `N-M/T`.
    #[arg(long)]
    pub node: Option<NodeSpec>,

    /// Splice parent words into `?w`/`?W` instead of running alone.
    #[arg(long, default_value_t = false)]
    pub stacked: bool,

    #[arg(long, value_delimiter = ',')]
    pub internal_ranges: Vec<usize>,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            pattern: "?a?a?a?a".to_string(),
            custom_1: None,
            custom_2: None,
            custom_3: None,
            custom_4: None,
            custom_5: None,
            custom_6: None,
            custom_7: None,
            custom_8: None,
            custom_9: None,
            encoding: Encoding::Ascii,
            case_insensitive: false,
            min_length: None,
            max_length: None,
            native_min_length: 0,
            native_max_length: DEFAULT_NATIVE_MAX_LENGTH,
            node: None,
            stacked: false,
            internal_ranges: Vec::new(),
        }
    }
}

impl MaskConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> MaskResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            MaskError::Config(format!(
                "failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Overlays the arguments the user typed explicitly onto `self`.
    pub fn merge_from_cli(&mut self, cli: &MaskConfig, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$field = cli.$field.clone();
                }
            };
        }

        update_if_present!(pattern);
        update_if_present!(custom_1);
        update_if_present!(custom_2);
        update_if_present!(custom_3);
        update_if_present!(custom_4);
        update_if_present!(custom_5);
        update_if_present!(custom_6);
        update_if_present!(custom_7);
        update_if_present!(custom_8);
        update_if_present!(custom_9);
        update_if_present!(encoding);
        update_if_present!(case_insensitive);
        update_if_present!(min_length);
        update_if_present!(max_length);
        update_if_present!(native_min_length);
        update_if_present!(native_max_length);
        update_if_present!(node);
        update_if_present!(stacked);
        update_if_present!(internal_ranges);
    }

    /// `?1`..`?9` definitions in slot order, empty when undefined.
    pub fn custom(&self) -> Vec<String> {
        [
            &self.custom_1,
            &self.custom_2,
            &self.custom_3,
            &self.custom_4,
            &self.custom_5,
            &self.custom_6,
            &self.custom_7,
            &self.custom_8,
            &self.custom_9,
        ]
        .into_iter()
        .map(|c| c.clone().unwrap_or_default())
        .collect()
    }

    pub fn to_options(&self) -> MaskOptions {
        MaskOptions::builder()
            .pattern(self.pattern.clone())
            .custom(self.custom())
            .encoding(self.encoding)
            .case_sensitive(!self.case_insensitive)
            .min_length(self.min_length)
            .max_length(self.max_length)
            .native_min_length(self.native_min_length)
            .native_max_length(self.native_max_length)
            .node(self.node)
            .stacked(self.stacked)
            .internal_ranges(self.internal_ranges.clone())
            .build()
    }
}
