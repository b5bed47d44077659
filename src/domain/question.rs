/// Quiz content: questions and the bank they are drawn from.
///
/// Questions are authored outside the game (embedded defaults or a
/// `questions.toml` file) and never change once loaded.
///
/// ```toml
/// [[question]]
/// level = 1
/// image = "fractions.png"
/// prompt = "What is 1/2 + 1/4?"
/// answers = ["3/4", "2/6", "1/8", "2/4"]
/// correct = 0
/// solution = "fractions_solution.png"
/// ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{GameError, GameResult};

pub const ANSWER_COUNT: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizQuestion {
    pub level: usize,
    pub image: Option<String>,
    pub prompt: String,
    pub answers: [String; ANSWER_COUNT],
    pub correct_index: usize,
    pub solution_image: Option<String>,
}

impl QuizQuestion {
    /// `Some(is_correct)` for a valid answer index, `None` otherwise.
    pub fn check(&self, selected: usize) -> Option<bool> {
        (selected < ANSWER_COUNT).then_some(selected == self.correct_index)
    }

    pub fn correct_answer(&self) -> &str {
        &self.answers[self.correct_index]
    }
}

#[derive(Deserialize)]
struct QuestionFile {
    #[serde(default)]
    question: Vec<RawQuestion>,
}

#[derive(Deserialize)]
struct RawQuestion {
    #[serde(default)]
    level: usize,
    #[serde(default)]
    image: Option<String>,
    prompt: String,
    answers: Vec<String>,
    correct: usize,
    #[serde(default)]
    solution: Option<String>,
}

impl RawQuestion {
    fn validate(self, index: usize) -> GameResult<QuizQuestion> {
        let answers: [String; ANSWER_COUNT] =
            self.answers.try_into().map_err(|v: Vec<String>| GameError::Question {
                index,
                reason: format!("expected {ANSWER_COUNT} answers, found {}", v.len()),
            })?;
        if self.correct >= ANSWER_COUNT {
            return Err(GameError::Question {
                index,
                reason: format!("correct index {} out of range", self.correct),
            });
        }
        Ok(QuizQuestion {
            level: self.level,
            image: self.image,
            prompt: self.prompt,
            answers,
            correct_index: self.correct,
            solution_image: self.solution,
        })
    }
}

#[derive(Clone, Debug)]
pub struct QuestionBank {
    questions: Vec<QuizQuestion>,
}

impl QuestionBank {
    #[cfg(test)]
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        QuestionBank { questions }
    }

    pub fn parse(text: &str) -> GameResult<Self> {
        let file: QuestionFile = toml::from_str(text).map_err(|source| GameError::Toml {
            path: "questions".into(),
            source,
        })?;
        let questions = file
            .question
            .into_iter()
            .enumerate()
            .map(|(i, q)| q.validate(i))
            .collect::<GameResult<Vec<_>>>()?;
        Ok(QuestionBank { questions })
    }

    pub fn load(path: &Path) -> GameResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| GameError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        QuestionBank::parse(&text).map_err(|e| match e {
            GameError::Toml { source, .. } => GameError::Toml { path: path.to_path_buf(), source },
            other => other,
        })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QuizQuestion> {
        self.questions.get(index)
    }

    /// Bank index for the `nth` checkpoint of `level`: the level's own
    /// questions in order, cycling if there are too few, then the whole
    /// bank as a last resort.
    pub fn index_for(&self, level: usize, nth: usize) -> Option<usize> {
        let own: Vec<usize> = self
            .questions
            .iter()
            .enumerate()
            .filter(|(_, q)| q.level == level)
            .map(|(i, _)| i)
            .collect();
        if !own.is_empty() {
            return Some(own[nth % own.len()]);
        }
        if self.questions.is_empty() {
            None
        } else {
            Some(nth % self.questions.len())
        }
    }

    pub fn embedded() -> Self {
        let mut questions = Vec::new();
        for (level, image, prompt, answers, correct, solution) in EMBEDDED {
            questions.push(QuizQuestion {
                level: *level,
                image: Some((*image).to_string()),
                prompt: (*prompt).to_string(),
                answers: answers.map(|a| a.to_string()),
                correct_index: *correct,
                solution_image: Some((*solution).to_string()),
            });
        }
        QuestionBank { questions }
    }
}

type EmbeddedQuestion = (usize, &'static str, &'static str, [&'static str; 4], usize, &'static str);

const EMBEDDED: &[EmbeddedQuestion] = &[
    (1, "fractions.png", "What is 1/2 + 1/4?", ["3/4", "2/6", "1/8", "2/4"], 0, "fractions_solution.png"),
    (1, "area.png", "A rectangle is 6 by 4. What is its area?", ["10", "20", "24", "48"], 2, "area_solution.png"),
    (1, "primes.png", "Which number is prime?", ["21", "27", "29", "33"], 2, "primes_solution.png"),
    (1, "percent.png", "What is 25% of 80?", ["15", "20", "25", "40"], 1, "percent_solution.png"),
    (1, "order.png", "What is 3 + 4 × 2?", ["14", "11", "10", "9"], 1, "order_solution.png"),
    (2, "water.png", "At sea level, water boils at…", ["90 °C", "100 °C", "110 °C", "120 °C"], 1, "water_solution.png"),
    (2, "planets.png", "Which planet is closest to the Sun?", ["Venus", "Earth", "Mars", "Mercury"], 3, "planets_solution.png"),
    (2, "plants.png", "Plants take in which gas for photosynthesis?", ["Oxygen", "Nitrogen", "Carbon dioxide", "Helium"], 2, "plants_solution.png"),
    (2, "states.png", "Ice melting into water is a change from…", ["gas to liquid", "solid to liquid", "liquid to gas", "solid to gas"], 1, "states_solution.png"),
    (2, "magnet.png", "Which material is attracted to a magnet?", ["Wood", "Glass", "Iron", "Plastic"], 2, "magnet_solution.png"),
    (2, "bones.png", "How many bones does an adult human have?", ["106", "206", "306", "406"], 1, "bones_solution.png"),
    (2, "light.png", "Light travels fastest through…", ["water", "glass", "a vacuum", "air"], 2, "light_solution.png"),
    (2, "moon.png", "The Moon shines because it…", ["burns gas", "reflects sunlight", "is hot rock", "has lamps"], 1, "moon_solution.png"),
    (2, "heart.png", "How many chambers does the human heart have?", ["2", "3", "4", "5"], 2, "heart_solution.png"),
    (2, "food.png", "Which of these is a producer in a food chain?", ["Grass", "Rabbit", "Fox", "Hawk"], 0, "food_solution.png"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_question_file() {
        let text = r#"
            [[question]]
            level = 3
            prompt = "2 + 2?"
            answers = ["3", "4", "5", "6"]
            correct = 1

            [[question]]
            level = 3
            image = "q.png"
            prompt = "Capital of France?"
            answers = ["Rome", "Paris", "Oslo", "Bern"]
            correct = 1
            solution = "s.png"
        "#;
        let bank = QuestionBank::parse(text).unwrap();
        assert_eq!(bank.len(), 2);
        let q = bank.get(1).unwrap();
        assert_eq!(q.image.as_deref(), Some("q.png"));
        assert_eq!(q.correct_answer(), "Paris");
        assert_eq!(q.check(1), Some(true));
        assert_eq!(q.check(0), Some(false));
        assert_eq!(q.check(4), None);
    }

    #[test]
    fn rejects_wrong_answer_count_and_bad_index() {
        let three = r#"
            [[question]]
            prompt = "?"
            answers = ["a", "b", "c"]
            correct = 0
        "#;
        assert!(matches!(QuestionBank::parse(three), Err(GameError::Question { index: 0, .. })));

        let bad_index = r#"
            [[question]]
            prompt = "?"
            answers = ["a", "b", "c", "d"]
            correct = 7
        "#;
        assert!(matches!(QuestionBank::parse(bad_index), Err(GameError::Question { .. })));
    }

    #[test]
    fn assignment_cycles_within_level_then_falls_back() {
        let bank = QuestionBank::embedded();
        let level1: Vec<usize> = (0..7).filter_map(|k| bank.index_for(1, k)).collect();
        assert_eq!(level1, vec![0, 1, 2, 3, 4, 0, 1]);
        assert_eq!(bank.index_for(2, 0), Some(5));
        // Level with no own questions draws from the whole bank.
        assert_eq!(bank.index_for(42, 3), Some(3));
        assert_eq!(QuestionBank::new(vec![]).index_for(1, 0), None);
    }

    #[test]
    fn embedded_bank_is_consistent() {
        let bank = QuestionBank::embedded();
        assert_eq!(bank.len(), 15);
        for i in 0..bank.len() {
            let q = bank.get(i).unwrap();
            assert!(q.correct_index < ANSWER_COUNT);
        }
    }
}
