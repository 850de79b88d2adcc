use crate::models::Mood;
use serde::{Deserialize, Serialize};

/// One dominant-expression reading from the detection source
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub expression: Mood,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl Detection {
    /// Create a detection, clamping confidence to [0, 1]
    pub fn new(expression: Mood, confidence: f32) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            expression,
            confidence,
        }
    }

    /// Confidence as a whole percentage, e.g. "85%"
    pub fn percentage(&self) -> String {
        format!("{:.0}%", self.confidence * 100.0)
    }
}

/// Per-class scores for a single detected face
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionScores {
    #[serde(default)]
    pub happy: f32,
    #[serde(default)]
    pub sad: f32,
    #[serde(default)]
    pub angry: f32,
    #[serde(default)]
    pub fearful: f32,
    #[serde(default)]
    pub disgusted: f32,
    #[serde(default)]
    pub surprised: f32,
    #[serde(default)]
    pub neutral: f32,
}

impl ExpressionScores {
    pub fn get(&self, mood: Mood) -> f32 {
        match mood {
            Mood::Happy => self.happy,
            Mood::Sad => self.sad,
            Mood::Angry => self.angry,
            Mood::Fearful => self.fearful,
            Mood::Disgusted => self.disgusted,
            Mood::Surprised => self.surprised,
            Mood::Neutral => self.neutral,
        }
    }

    /// Highest-scoring expression, or `None` when no class scored above zero
    ///
    /// Ties go to the mood listed first in [`Mood::ALL`].
    pub fn dominant(&self) -> Option<Detection> {
        let mut best: Option<(Mood, f32)> = None;

        for mood in Mood::ALL {
            let score = self.get(mood);
            if !score.is_finite() || score <= 0.0 {
                continue;
            }
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((mood, score));
            }
        }

        best.map(|(mood, score)| Detection::new(mood, score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_expression() {
        let scores = ExpressionScores {
            happy: 0.12,
            neutral: 0.80,
            surprised: 0.05,
            ..Default::default()
        };

        let detection = scores.dominant().unwrap();
        assert_eq!(detection.expression, Mood::Neutral);
        assert_eq!(detection.percentage(), "80%");
    }

    #[test]
    fn test_no_face_means_no_detection() {
        assert!(ExpressionScores::default().dominant().is_none());

        let garbage = ExpressionScores {
            sad: f32::NAN,
            ..Default::default()
        };
        assert!(garbage.dominant().is_none());
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Detection::new(Mood::Sad, 1.4).confidence, 1.0);
        assert_eq!(Detection::new(Mood::Sad, -0.2).confidence, 0.0);
        assert_eq!(Detection::new(Mood::Sad, f32::INFINITY).confidence, 0.0);
    }
}
