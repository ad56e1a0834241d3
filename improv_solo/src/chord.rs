// Chord vocabulary and progression input.
//
// The generator consumes a progression as an ordered list of
// `ChordContext`s: a root pitch class, a quality, and the 12-bit set of
// pitch classes the quality sounds (relative to the root), plus the beat
// span the chord occupies. Qualities are a closed enum; symbols the parser
// does not know degrade to `ChordQuality::DEFAULT` with a warning so that a
// lead sheet with an odd extension still produces a solo.
//
// Text forms accepted by `Progression::parse`: whitespace-separated
// `SYMBOL:BEATS` items, e.g. "Cm7:4 F7:4 Bbmaj7:8". A bare symbol defaults
// to four beats.

use crate::error::{Result, SoloError};
use serde::{Deserialize, Serialize};

/// Chord qualities the generator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Sus2,
    Sus4,
    Major6,
    Minor6,
    Major7,
    Minor7,
    Dominant7,
    HalfDiminished7,
    Diminished7,
    MinorMajor7,
    Dominant7Sus4,
    Dominant9,
    Minor9,
    Major9,
    Dominant7Flat9,
    Dominant7Sharp9,
    Dominant7Sharp11,
    Altered,
    Dominant13,
    Minor11,
    Augmented7,
}

impl ChordQuality {
    /// Quality used when a symbol is not recognized.
    pub const DEFAULT: ChordQuality = ChordQuality::Major;

    /// Semitone offsets above the root that the quality sounds.
    pub fn intervals(self) -> &'static [u8] {
        use ChordQuality::*;
        match self {
            Major => &[0, 4, 7],
            Minor => &[0, 3, 7],
            Diminished => &[0, 3, 6],
            Augmented => &[0, 4, 8],
            Sus2 => &[0, 2, 7],
            Sus4 => &[0, 5, 7],
            Major6 => &[0, 4, 7, 9],
            Minor6 => &[0, 3, 7, 9],
            Major7 => &[0, 4, 7, 11],
            Minor7 => &[0, 3, 7, 10],
            Dominant7 => &[0, 4, 7, 10],
            HalfDiminished7 => &[0, 3, 6, 10],
            Diminished7 => &[0, 3, 6, 9],
            MinorMajor7 => &[0, 3, 7, 11],
            Dominant7Sus4 => &[0, 5, 7, 10],
            Dominant9 => &[0, 2, 4, 7, 10],
            Minor9 => &[0, 2, 3, 7, 10],
            Major9 => &[0, 2, 4, 7, 11],
            Dominant7Flat9 => &[0, 1, 4, 7, 10],
            Dominant7Sharp9 => &[0, 3, 4, 7, 10],
            Dominant7Sharp11 => &[0, 4, 6, 7, 10],
            Altered => &[0, 1, 3, 4, 6, 8, 10],
            Dominant13 => &[0, 2, 4, 7, 9, 10],
            Minor11 => &[0, 2, 3, 5, 7, 10],
            Augmented7 => &[0, 4, 8, 10],
        }
    }

    /// The quality as a pitch-class set indexed by semitones above the root.
    pub fn pitch_classes(self) -> [bool; 12] {
        let mut pcs = [false; 12];
        for &interval in self.intervals() {
            pcs[interval as usize] = true;
        }
        pcs
    }

    /// Look up a quality suffix ("m7", "maj7", "7b9", ...).
    pub fn from_symbol(suffix: &str) -> Option<ChordQuality> {
        use ChordQuality::*;
        let quality = match suffix {
            "" | "M" | "maj" => Major,
            "m" | "min" | "-" => Minor,
            "dim" | "o" => Diminished,
            "aug" | "+" => Augmented,
            "sus2" => Sus2,
            "sus" | "sus4" => Sus4,
            "6" | "M6" => Major6,
            "m6" | "-6" => Minor6,
            "maj7" | "M7" | "Δ" | "Δ7" => Major7,
            "m7" | "min7" | "-7" => Minor7,
            "7" => Dominant7,
            "m7b5" | "ø" | "ø7" | "-7b5" => HalfDiminished7,
            "dim7" | "o7" => Diminished7,
            "mM7" | "m(maj7)" | "-M7" => MinorMajor7,
            "7sus4" | "7sus" => Dominant7Sus4,
            "9" => Dominant9,
            "m9" | "-9" => Minor9,
            "maj9" | "M9" => Major9,
            "7b9" => Dominant7Flat9,
            "7#9" => Dominant7Sharp9,
            "7#11" => Dominant7Sharp11,
            "7alt" | "alt" => Altered,
            "13" => Dominant13,
            "m11" | "-11" => Minor11,
            "aug7" | "7#5" | "+7" => Augmented7,
            _ => return None,
        };
        Some(quality)
    }

    /// Like `from_symbol`, but unknown suffixes fall back to `DEFAULT`.
    pub fn parse(suffix: &str) -> ChordQuality {
        Self::from_symbol(suffix).unwrap_or_else(|| {
            log::warn!(
                "unknown chord quality '{suffix}', using {:?}",
                ChordQuality::DEFAULT
            );
            ChordQuality::DEFAULT
        })
    }
}

/// A chord symbol: root pitch class plus quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordSymbol {
    pub root: u8,
    pub quality: ChordQuality,
}

impl ChordSymbol {
    /// Parse "Cm7", "F#7", "Bbmaj7". The root letter is required; an
    /// unrecognized quality suffix degrades to the default quality.
    pub fn parse(text: &str) -> Result<ChordSymbol> {
        let mut chars = text.chars();
        let letter = chars
            .next()
            .ok_or_else(|| SoloError::Parse("empty chord symbol".into()))?;
        let natural: i32 = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            other => {
                return Err(SoloError::Parse(format!(
                    "chord symbol '{text}' starts with '{other}', not a note letter"
                )));
            }
        };
        let rest = chars.as_str();
        let (accidental, suffix) = if let Some(s) = rest.strip_prefix('#') {
            (1, s)
        } else if let Some(s) = rest.strip_prefix('b') {
            (-1, s)
        } else {
            (0, rest)
        };
        Ok(ChordSymbol {
            root: crate::pitch::pitch_class(natural + accidental),
            quality: ChordQuality::parse(suffix),
        })
    }
}

/// One chord of the progression as the generator sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordContext {
    /// Root pitch class, 0..12 (C = 0).
    pub root: u8,
    pub quality: ChordQuality,
    /// Active pitch classes relative to the root.
    pub quality_vector: [bool; 12],
    /// Beat on which the chord starts, counted from the top of the tune.
    pub start_beat: u32,
    pub duration_beats: u32,
}

impl ChordContext {
    pub fn new(root: u8, quality: ChordQuality, start_beat: u32, duration_beats: u32) -> Self {
        ChordContext {
            root: root % 12,
            quality,
            quality_vector: quality.pitch_classes(),
            start_beat,
            duration_beats,
        }
    }

    /// Beat after the chord's last beat. Saturates; a progression that
    /// passes `SoloGenerator` validation never reaches `u32::MAX`.
    pub fn end_beat(&self) -> u32 {
        self.start_beat.saturating_add(self.duration_beats)
    }
}

/// An ordered, contiguous chord progression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    pub chords: Vec<ChordContext>,
}

impl Progression {
    /// Build a progression from (symbol, beats) pairs, laying chords end to
    /// end starting at beat 0. Fails if the total length overflows `u32`.
    pub fn from_symbols(items: &[(ChordSymbol, u32)]) -> Result<Self> {
        let mut chords = Vec::with_capacity(items.len());
        let mut beat: u32 = 0;
        for &(symbol, beats) in items {
            chords.push(ChordContext::new(symbol.root, symbol.quality, beat, beats));
            beat = beat.checked_add(beats).ok_or_else(|| {
                SoloError::Parse(format!(
                    "progression is too long: {beats} more beats after beat {beat}"
                ))
            })?;
        }
        Ok(Progression { chords })
    }

    /// Parse "Cm7:4 G7:4" style text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut items = Vec::new();
        for token in text.split_whitespace() {
            let (symbol, beats) = match token.split_once(':') {
                Some((symbol, beats)) => {
                    let beats: u32 = beats.parse().map_err(|_| {
                        SoloError::Parse(format!("bad beat count in '{token}'"))
                    })?;
                    (symbol, beats)
                }
                None => (token, 4),
            };
            if beats == 0 {
                return Err(SoloError::Parse(format!("chord '{token}' has zero beats")));
            }
            items.push((ChordSymbol::parse(symbol)?, beats));
        }
        Self::from_symbols(&items)
    }

    pub fn total_beats(&self) -> u32 {
        self.chords.last().map_or(0, ChordContext::end_beat)
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_seventh_pitch_classes() {
        let pcs = ChordQuality::Minor7.pitch_classes();
        let active: Vec<usize> = (0..12).filter(|&i| pcs[i]).collect();
        assert_eq!(active, vec![0, 3, 7, 10]);
    }

    #[test]
    fn every_quality_contains_its_root() {
        use ChordQuality::*;
        for q in [
            Major, Minor, Diminished, Augmented, Sus2, Sus4, Major6, Minor6, Major7, Minor7,
            Dominant7, HalfDiminished7, Diminished7, MinorMajor7, Dominant7Sus4, Dominant9,
            Minor9, Major9, Dominant7Flat9, Dominant7Sharp9, Dominant7Sharp11, Altered,
            Dominant13, Minor11, Augmented7,
        ] {
            assert!(q.pitch_classes()[0], "{q:?} is missing its root");
        }
    }

    #[test]
    fn unknown_quality_degrades_to_default() {
        assert_eq!(ChordQuality::from_symbol("7b13#9sus"), None);
        assert_eq!(ChordQuality::parse("7b13#9sus"), ChordQuality::DEFAULT);
    }

    #[test]
    fn symbols_with_accidentals() {
        let s = ChordSymbol::parse("Bbmaj7").unwrap();
        assert_eq!(s.root, 10);
        assert_eq!(s.quality, ChordQuality::Major7);

        let s = ChordSymbol::parse("F#m7b5").unwrap();
        assert_eq!(s.root, 6);
        assert_eq!(s.quality, ChordQuality::HalfDiminished7);

        let s = ChordSymbol::parse("Cb").unwrap();
        assert_eq!(s.root, 11);
        assert_eq!(s.quality, ChordQuality::Major);
    }

    #[test]
    fn bad_root_is_an_error() {
        assert!(ChordSymbol::parse("H7").is_err());
        assert!(ChordSymbol::parse("").is_err());
    }

    #[test]
    fn progression_lays_chords_end_to_end() {
        let prog = Progression::parse("Cm7:4 G7:4 Cm7").unwrap();
        assert_eq!(prog.chords.len(), 3);
        assert_eq!(prog.chords[0].root, 0);
        assert_eq!(prog.chords[1].root, 7);
        assert_eq!(prog.chords[1].start_beat, 4);
        assert_eq!(prog.chords[2].start_beat, 8);
        assert_eq!(prog.total_beats(), 12);
    }

    #[test]
    fn progression_rejects_zero_or_garbage_beats() {
        assert!(Progression::parse("C7:0").is_err());
        assert!(Progression::parse("C7:x").is_err());
    }

    #[test]
    fn progression_longer_than_u32_beats_is_a_parse_error() {
        assert!(matches!(
            Progression::parse("C7:4294967295 G7:4"),
            Err(SoloError::Parse(_))
        ));
        // The largest representable length still parses.
        let prog = Progression::parse("C7:4294967291 G7:4").unwrap();
        assert_eq!(prog.total_beats(), u32::MAX);
    }
}
