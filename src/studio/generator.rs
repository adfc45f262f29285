// src/studio/generator.rs

use std::{collections::HashSet, fmt};

use async_trait::async_trait;

/// Blank inserted in place of the keyword in cloze cards and questions.
pub const CLOZE_BLANK: &str = "_____";

const MIN_SENTENCE_WORDS: usize = 5;
const MAX_SENTENCE_WORDS: usize = 60;
const MIN_KEYWORD_LETTERS: usize = 5;
const DISTRACTORS: usize = 3;

const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "along", "already", "also", "although",
    "always", "among", "another", "around", "because", "become", "becomes", "before", "being",
    "below", "between", "beyond", "cannot", "could", "during", "either", "enough", "every",
    "first", "further", "having", "however", "itself", "might", "never", "often", "other",
    "others", "otherwise", "perhaps", "rather", "second", "shall", "should", "since", "still",
    "their", "there", "therefore", "these", "thing", "things", "third", "those", "though",
    "through", "throughout", "together", "toward", "towards", "under", "until", "usually",
    "where", "whereas", "whether", "which", "while", "whose", "within", "without", "would",
    "yourself",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCard {
    pub front: String,
    pub back: String,
}

/// A single-choice question; `answer` is one of `options`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuestion {
    pub content: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, Default)]
pub struct StudyContent {
    pub summary: String,
    pub cards: Vec<GeneratedCard>,
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// No sentence of usable length was found.
    NoSentences,
    /// Sentences were found but none had a keyword to blank out.
    NoKeywords,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::NoSentences => write!(
                f,
                "no sentences between {MIN_SENTENCE_WORDS} and {MAX_SENTENCE_WORDS} words were found"
            ),
            GenerationError::NoKeywords => write!(f, "no keywords suitable for flashcards were found"),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Turns material text into study content.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, text: &str) -> Result<StudyContent, GenerationError>;

    /// Short name recorded in logs.
    fn name(&self) -> &'static str;
}

/// Rule-based generator that works offline from the text alone.
#[derive(Debug, Clone)]
pub struct LocalGenerator {
    pub max_cards: usize,
    pub summary_sentences: usize,
}

impl Default for LocalGenerator {
    fn default() -> Self {
        Self {
            max_cards: 20,
            summary_sentences: 3,
        }
    }
}

/// Sentence kept for generation, with its keyword when it has one.
struct Sentence {
    text: String,
    keyword: Option<String>,
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let terminal = matches!(c, '.' | '!' | '?');
        let boundary = chars.peek().is_none_or(|next| next.is_whitespace());
        if terminal && boundary {
            let sentence = current.split_whitespace().collect::<Vec<_>>().join(" ");
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let tail = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Strips leading and trailing punctuation from a whitespace token.
fn bare_word(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_alphanumeric())
}

fn is_keyword_candidate(word: &str) -> bool {
    word.chars().count() >= MIN_KEYWORD_LETTERS
        && word.chars().all(char::is_alphabetic)
        && !STOP_WORDS.contains(&word.to_lowercase().as_str())
}

/// Longest non-stop word of at least five letters; the first one wins ties.
fn pick_keyword(sentence: &str) -> Option<String> {
    let mut best: Option<&str> = None;
    for word in sentence.split_whitespace().map(bare_word) {
        if !is_keyword_candidate(word) {
            continue;
        }
        if best.is_none_or(|b| word.chars().count() > b.chars().count()) {
            best = Some(word);
        }
    }
    best.map(str::to_string)
}

/// Replaces the first whole-word occurrence of `keyword` with the blank.
fn blank_out(sentence: &str, keyword: &str) -> String {
    let mut replaced = false;
    sentence
        .split_whitespace()
        .map(|token| {
            let word = bare_word(token);
            if !replaced && word == keyword {
                replaced = true;
                token.replacen(word, CLOZE_BLANK, 1)
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl LocalGenerator {
    fn kept_sentences(&self, text: &str) -> Vec<Sentence> {
        split_sentences(text)
            .into_iter()
            .filter(|s| {
                let words = s.split_whitespace().count();
                (MIN_SENTENCE_WORDS..=MAX_SENTENCE_WORDS).contains(&words)
            })
            .map(|text| Sentence {
                keyword: pick_keyword(&text),
                text,
            })
            .collect()
    }

    /// Picks distractors from the other keywords, rotating through the pool
    /// so neighbouring questions do not share the same wrong answers.
    fn distractors(pool: &[String], answer: &str, offset: usize) -> Vec<String> {
        let answer_key = answer.to_lowercase();
        (1..=pool.len())
            .map(|step| &pool[(offset + step) % pool.len()])
            .filter(|candidate| candidate.to_lowercase() != answer_key)
            .take(DISTRACTORS)
            .cloned()
            .collect()
    }

    pub fn build(&self, text: &str) -> Result<StudyContent, GenerationError> {
        let sentences = self.kept_sentences(text);
        if sentences.is_empty() {
            return Err(GenerationError::NoSentences);
        }

        let summary = sentences
            .iter()
            .take(self.summary_sentences)
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let clozes: Vec<(String, String)> = sentences
            .iter()
            .filter_map(|s| {
                s.keyword
                    .as_ref()
                    .map(|k| (blank_out(&s.text, k), k.clone()))
            })
            .take(self.max_cards)
            .collect();

        if clozes.is_empty() {
            return Err(GenerationError::NoKeywords);
        }

        let mut seen = HashSet::new();
        let pool: Vec<String> = clozes
            .iter()
            .map(|(_, k)| k.clone())
            .filter(|k| seen.insert(k.to_lowercase()))
            .collect();

        let questions = if pool.len() > DISTRACTORS {
            clozes
                .iter()
                .enumerate()
                .map(|(i, (front, keyword))| {
                    let offset = pool
                        .iter()
                        .position(|k| k.eq_ignore_ascii_case(keyword))
                        .unwrap_or(i);
                    let mut options = Self::distractors(&pool, keyword, offset);
                    options.insert(i % (DISTRACTORS + 1), keyword.clone());
                    GeneratedQuestion {
                        content: format!("Fill in the blank: {front}"),
                        options,
                        answer: keyword.clone(),
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        let cards = clozes
            .into_iter()
            .map(|(front, back)| GeneratedCard { front, back })
            .collect();

        Ok(StudyContent {
            summary,
            cards,
            questions,
        })
    }
}

#[async_trait]
impl ContentGenerator for LocalGenerator {
    async fn generate(&self, text: &str) -> Result<StudyContent, GenerationError> {
        self.build(text)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "Photosynthesis converts light energy into chemical energy inside plants. \
        The chloroplast contains pigments that absorb sunlight very well. \
        Carbon dioxide enters leaves through small openings called stomata. \
        Glucose produced by the process feeds the growing organism. \
        Too short. \
        Oxygen is released as a byproduct of splitting water molecules.";

    #[test]
    fn splits_on_terminal_punctuation_only() {
        let sentences = split_sentences("Version 2.5 is out! Is it stable? Yes. trailing words");
        assert_eq!(
            sentences,
            vec!["Version 2.5 is out!", "Is it stable?", "Yes.", "trailing words"]
        );
    }

    #[test]
    fn keyword_is_longest_non_stop_word() {
        assert_eq!(
            pick_keyword("Between the oceans, continents drift slowly."),
            Some("continents".to_string())
        );
        assert_eq!(pick_keyword("It is a big cat."), None);
        assert_eq!(pick_keyword("Therefore whatever happens, which cannot be."), Some("whatever".to_string()));
    }

    #[test]
    fn blank_keeps_punctuation() {
        assert_eq!(
            blank_out("Plants need (sunlight), water and sunlight.", "sunlight"),
            "Plants need (_____), water and sunlight."
        );
    }

    #[test]
    fn builds_summary_cards_and_questions() {
        let content = LocalGenerator::default().build(TEXT).unwrap();

        assert!(content.summary.starts_with("Photosynthesis converts"));
        assert!(content.summary.ends_with("called stomata."));
        assert!(!content.summary.contains("Too short"));

        assert_eq!(content.cards.len(), 5);
        assert_eq!(content.cards[0].back, "Photosynthesis");
        assert!(content.cards[0].front.starts_with(CLOZE_BLANK));

        assert_eq!(content.questions.len(), 5);
        for q in &content.questions {
            assert_eq!(q.options.len(), 4);
            assert!(q.options.contains(&q.answer));
            let distinct: HashSet<_> = q.options.iter().map(|o| o.to_lowercase()).collect();
            assert_eq!(distinct.len(), 4);
            assert!(q.content.contains(CLOZE_BLANK));
        }
    }

    #[test]
    fn answer_position_varies() {
        let content = LocalGenerator::default().build(TEXT).unwrap();
        let positions: HashSet<usize> = content
            .questions
            .iter()
            .filter_map(|q| q.options.iter().position(|o| o == &q.answer))
            .collect();
        assert!(positions.len() > 1);
    }

    #[test]
    fn too_few_keywords_means_no_questions() {
        let text = "Volcanoes erupt when magma rises quickly. \
            Glaciers carve valleys over many centuries.";
        let content = LocalGenerator::default().build(text).unwrap();
        assert_eq!(content.cards.len(), 2);
        assert!(content.questions.is_empty());
    }

    #[test]
    fn caps_the_number_of_cards() {
        let generator = LocalGenerator {
            max_cards: 2,
            ..LocalGenerator::default()
        };
        let content = generator.build(TEXT).unwrap();
        assert_eq!(content.cards.len(), 2);
        assert!(content.questions.is_empty());
    }

    #[test]
    fn reports_unusable_text() {
        let generator = LocalGenerator::default();
        assert_eq!(generator.build("Too short. Also short!").unwrap_err(), GenerationError::NoSentences);
        assert_eq!(
            generator.build("It is a big red cat and a dog.").unwrap_err(),
            GenerationError::NoKeywords
        );
    }

    #[tokio::test]
    async fn trait_object_delegates_to_rules() {
        let generator: Box<dyn ContentGenerator> = Box::new(LocalGenerator::default());
        let content = generator.generate(TEXT).await.unwrap();
        assert_eq!(generator.name(), "local");
        assert!(!content.cards.is_empty());
    }
}
