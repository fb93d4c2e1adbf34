use std::collections::HashMap;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use super::hex::Rgba;

/// Categorical color schemes, named as the d3-scale-chromatic constants they reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Palette {
    #[default]
    Category10,
    Accent,
    Dark2,
    Set1,
    Set2,
    Set3,
    Paired,
    Pastel1,
    Pastel2,
}

impl Palette {
    pub const ALL: [Palette; 9] = [
        Palette::Category10,
        Palette::Accent,
        Palette::Dark2,
        Palette::Set1,
        Palette::Set2,
        Palette::Set3,
        Palette::Paired,
        Palette::Pastel1,
        Palette::Pastel2,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Palette::Category10 => "schemeCategory10",
            Palette::Accent => "schemeAccent",
            Palette::Dark2 => "schemeDark2",
            Palette::Set1 => "schemeSet1",
            Palette::Set2 => "schemeSet2",
            Palette::Set3 => "schemeSet3",
            Palette::Paired => "schemePaired",
            Palette::Pastel1 => "schemePastel1",
            Palette::Pastel2 => "schemePastel2",
        }
    }

    pub fn from_name(name: &str) -> anyhow::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|palette| palette.name() == name)
            .ok_or_else(|| anyhow!("Unknown palette '{}'", name))
    }

    fn hex_codes(&self) -> &'static [u32] {
        match self {
            Palette::Category10 => &[
                0x1f77b4, 0xff7f0e, 0x2ca02c, 0xd62728, 0x9467bd, 0x8c564b, 0xe377c2, 0x7f7f7f,
                0xbcbd22, 0x17becf,
            ],
            Palette::Accent => &[
                0x7fc97f, 0xbeaed4, 0xfdc086, 0xffff99, 0x386cb0, 0xf0027f, 0xbf5b17, 0x666666,
            ],
            Palette::Dark2 => &[
                0x1b9e77, 0xd95f02, 0x7570b3, 0xe7298a, 0x66a61e, 0xe6ab02, 0xa6761d, 0x666666,
            ],
            Palette::Set1 => &[
                0xe41a1c, 0x377eb8, 0x4daf4a, 0x984ea3, 0xff7f00, 0xffff33, 0xa65628, 0xf781bf,
                0x999999,
            ],
            Palette::Set2 => &[
                0x66c2a5, 0xfc8d62, 0x8da0cb, 0xe78ac3, 0xa6d854, 0xffd92f, 0xe5c494, 0xb3b3b3,
            ],
            Palette::Set3 => &[
                0x8dd3c7, 0xffffb3, 0xbebada, 0xfb8072, 0x80b1d3, 0xfdb462, 0xb3de69, 0xfccde5,
                0xd9d9d9, 0xbc80bd, 0xccebc5, 0xffed6f,
            ],
            Palette::Paired => &[
                0xa6cee3, 0x1f78b4, 0xb2df8a, 0x33a02c, 0xfb9a99, 0xe31a1c, 0xfdbf6f, 0xff7f00,
                0xcab2d6, 0x6a3d9a, 0xffff99, 0xb15928,
            ],
            Palette::Pastel1 => &[
                0xfbb4ae, 0xb3cde3, 0xccebc5, 0xdecbe4, 0xfed9a6, 0xffffcc, 0xe5d8bd, 0xfddaec,
                0xf2f2f2,
            ],
            Palette::Pastel2 => &[
                0xb3e2cd, 0xfdcdac, 0xcbd5e8, 0xf4cae4, 0xe6f5c9, 0xfff2ae, 0xf1e2cc, 0xcccccc,
            ],
        }
    }

    pub fn colors(&self) -> Vec<Rgba> {
        self.hex_codes()
            .iter()
            .map(|code| Rgba::opaque((code >> 16) as u8, (code >> 8) as u8, *code as u8))
            .collect()
    }
}

impl TryFrom<String> for Palette {
    type Error = anyhow::Error;

    fn try_from(name: String) -> anyhow::Result<Self> {
        Self::from_name(&name)
    }
}

impl From<Palette> for String {
    fn from(palette: Palette) -> Self {
        palette.name().to_owned()
    }
}

/// Assigns palette colors to category values in the order they are first seen,
/// wrapping around once the palette is exhausted.
#[derive(Debug, Clone)]
pub struct OrdinalScale {
    colors: Vec<Rgba>,
    domain: Vec<String>,
    indices: HashMap<String, usize>,
}

impl OrdinalScale {
    pub fn new(palette: Palette) -> Self {
        Self {
            colors: palette.colors(),
            domain: Vec::new(),
            indices: HashMap::new(),
        }
    }

    /// Build a scale whose domain is the distinct `values`, in first-appearance order.
    pub fn with_domain<I, S>(palette: Palette, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut scale = Self::new(palette);
        for value in values {
            scale.index_of(value.as_ref());
        }
        scale
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    fn index_of(&mut self, value: &str) -> usize {
        if let Some(index) = self.indices.get(value) {
            return *index;
        }
        let index = self.domain.len();
        self.domain.push(value.to_owned());
        self.indices.insert(value.to_owned(), index);
        index
    }

    /// Color for a value already in the domain.
    pub fn get(&self, value: &str) -> Option<Rgba> {
        self.indices
            .get(value)
            .map(|index| self.colors[index % self.colors.len()])
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{OrdinalScale, Palette};
    use crate::color::hex::Rgba;

    #[rstest]
    #[case(Palette::Category10, 10)]
    #[case(Palette::Accent, 8)]
    #[case(Palette::Set1, 9)]
    #[case(Palette::Set3, 12)]
    #[case(Palette::Paired, 12)]
    fn test_palette_sizes(#[case] palette: Palette, #[case] expected_len: usize) {
        assert_eq!(expected_len, palette.colors().len());
    }

    #[test]
    fn test_palette_names_round_trip() {
        for palette in Palette::ALL {
            assert_eq!(palette, Palette::from_name(palette.name()).unwrap());
        }
        assert!(Palette::from_name("schemeRainbow").is_err());
    }

    #[test]
    fn test_ordinal_scale_first_appearance_order() {
        let scale = OrdinalScale::with_domain(
            Palette::Category10,
            ["Templado", "Cálido", "Templado", "Semiseco"],
        );
        assert_eq!(vec!["Templado", "Cálido", "Semiseco"], scale.domain());
        assert_eq!(Some(Rgba::from_hex("#1f77b4").unwrap()), scale.get("Templado"));
        assert_eq!(Some(Rgba::from_hex("#ff7f0e").unwrap()), scale.get("Cálido"));
        assert_eq!(None, scale.get("Frío"));
    }

    #[test]
    fn test_ordinal_scale_cycles() {
        let values: Vec<String> = (0..9).map(|i| i.to_string()).collect();
        let scale = OrdinalScale::with_domain(Palette::Accent, &values);
        let colors: Vec<Option<Rgba>> = values.iter().map(|value| scale.get(value)).collect();
        assert_eq!(colors[0], colors[8]);
        assert_ne!(colors[0], colors[1]);
    }

    #[test]
    fn test_palette_from_config_name() {
        let palette: Palette = serde_yaml::from_str("schemeSet2").unwrap();
        assert_eq!(Palette::Set2, palette);
        assert_eq!("schemeSet2\n", serde_yaml::to_string(&palette).unwrap());
        let err = serde_yaml::from_str::<Palette>("schemeRainbow").unwrap_err();
        assert!(err.to_string().contains("Unknown palette"), "{}", err);
    }
}
