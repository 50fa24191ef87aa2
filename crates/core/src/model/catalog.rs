use thiserror::Error;

use crate::model::ids::QuestionIndex;
use crate::model::question::{Question, QuestionError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog has no questions")]
    Empty,

    #[error("question at position {position} has index {found}")]
    IndexMismatch { position: usize, found: QuestionIndex },

    #[error("catalog is too large: {0} questions")]
    TooLarge(usize),

    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Ordered, non-empty set of questions for one exam.
///
/// Question `i` always sits at position `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    /// # Errors
    ///
    /// Returns `CatalogError::Empty` for an empty list and
    /// `CatalogError::IndexMismatch` if indices are not `0..len` in order.
    pub fn new(questions: Vec<Question>) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::Empty);
        }
        if u32::try_from(questions.len()).is_err() {
            return Err(CatalogError::TooLarge(questions.len()));
        }
        for (position, question) in questions.iter().enumerate() {
            if question.index().as_usize() != position {
                return Err(CatalogError::IndexMismatch {
                    position,
                    found: question.index(),
                });
            }
        }
        Ok(Self { questions })
    }

    /// Build a catalog from `(text, options, correct)` rows, numbering them in order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if any row fails question validation.
    pub fn from_rows<'a, I>(rows: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (&'a str, &'a [&'a str], &'a str)>,
    {
        let mut questions = Vec::new();
        for (position, (text, options, correct)) in rows.into_iter().enumerate() {
            let index = u32::try_from(position).map_err(|_| CatalogError::TooLarge(position))?;
            let options = options.iter().map(|o| (*o).to_string()).collect();
            questions.push(Question::new(
                QuestionIndex::new(index),
                text,
                options,
                correct,
            )?);
        }
        Self::new(questions)
    }

    /// The built-in exam: programming, web and aptitude questions.
    ///
    /// # Panics
    ///
    /// Panics if the built-in rows fail validation.
    #[must_use]
    pub fn default_exam() -> Self {
        Self::from_rows(DEFAULT_EXAM.iter().map(|(t, o, c)| (*t, *o, *c)))
            .expect("built-in catalog should be valid")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: QuestionIndex) -> Option<&Question> {
        self.questions.get(index.as_usize())
    }

    #[must_use]
    pub fn first_index(&self) -> QuestionIndex {
        QuestionIndex::new(0)
    }

    /// Index of the final question.
    #[must_use]
    pub fn last_index(&self) -> QuestionIndex {
        // `new` guarantees 1 <= len <= u32::MAX.
        QuestionIndex::new(u32::try_from(self.questions.len() - 1).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub fn contains(&self, index: QuestionIndex) -> bool {
        index.as_usize() < self.questions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

type Row = (&'static str, &'static [&'static str], &'static str);

const DEFAULT_EXAM: &[Row] = &[
    (
        "What is the capital of India?",
        &["New Delhi", "Mumbai", "Bangalore", "Kolkata"],
        "New Delhi",
    ),
    (
        "Which language runs in a web browser?",
        &["Java", "C", "Python", "JavaScript"],
        "JavaScript",
    ),
    (
        "What does CSS stand for?",
        &[
            "Central Style Sheets",
            "Cascading Style Sheets",
            "Cascading Simple Sheets",
            "Computer Style Sheets",
        ],
        "Cascading Style Sheets",
    ),
    (
        "HTML stands for?",
        &[
            "Hyper Text Markup Language",
            "High Text Markup Language",
            "Hyperlink Text Mark Language",
            "Hyperlink and Text Markup Language",
        ],
        "Hyper Text Markup Language",
    ),
    (
        "Which of the following is a JavaScript framework?",
        &["Django", "React", "Laravel", "Flask"],
        "React",
    ),
    (
        "Which company developed React?",
        &["Google", "Facebook", "Microsoft", "Twitter"],
        "Facebook",
    ),
    (
        "If a train travels 60 km in 1.5 hours, what is its speed in km/h?",
        &["30", "40", "45", "50"],
        "40",
    ),
    ("What is 25% of 200?", &["25", "40", "50", "75"], "50"),
    (
        "If x + 5 = 12, what is the value of x?",
        &["5", "6", "7", "8"],
        "7",
    ),
    (
        "The sum of angles in a triangle is?",
        &["90°", "180°", "270°", "360°"],
        "180°",
    ),
    ("What is the LCM of 4 and 6?", &["10", "12", "14", "24"], "12"),
    (
        "Which HTML tag is used to create a hyperlink?",
        &["<a>", "<link>", "<href>", "<hyperlink>"],
        "<a>",
    ),
    (
        "Which CSS property is used to change text color?",
        &["color", "font-color", "text-color", "fg-color"],
        "color",
    ),
    (
        "Which SQL command is used to fetch data?",
        &["SELECT", "UPDATE", "INSERT", "DELETE"],
        "SELECT",
    ),
    (
        "Which keyword is used to declare a constant in JavaScript?",
        &["const", "let", "var", "static"],
        "const",
    ),
    (
        "A shopkeeper buys an item for $80 and sells for $100. What is the profit %?",
        &["20%", "25%", "15%", "10%"],
        "25%",
    ),
    ("If 5x = 45, find x.", &["5", "7", "9", "10"], "9"),
    (
        "What is the area of a rectangle with length 10 and width 5?",
        &["50", "25", "15", "30"],
        "50",
    ),
    (
        "If a car covers 120 km in 2 hours, what is its speed?",
        &["50 km/h", "60 km/h", "55 km/h", "70 km/h"],
        "60 km/h",
    ),
    (
        "The next number in the series 2, 4, 8, 16, ?",
        &["20", "24", "32", "36"],
        "32",
    ),
    (
        "Which of the following is a backend framework?",
        &["React", "Django", "Vue", "Angular"],
        "Django",
    ),
];
