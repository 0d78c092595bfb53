use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::CatalogError;

pub const ANIMAL_GUESS: &str = "animal-guess";
pub const NAMING: &str = "naming";
pub const REPETITION: &str = "repetition";
pub const FLUENCY: &str = "fluency";
pub const MEMORY: &str = "memory";
pub const ABSTRACTION: &str = "abstraction";

/// Number of animals shown in one animal-guess round
pub const QUIZ_ITEMS: usize = 3;

/// Stable identifier of a screening step
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_animal_guess(&self) -> bool {
        self.0 == ANIMAL_GUESS
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    pub id: StepId,
    pub title: String,
    pub description: String,
}

impl TestStep {
    pub fn new(id: &str, title: &str, description: &str) -> Self {
        Self {
            id: StepId::new(id),
            title: title.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalCard {
    /// Asset path, never inspected
    pub image: String,
    pub name: String,
    /// Spoken-style description of the picture. Must not contain the name.
    #[serde(default)]
    pub clue: String,
}

impl AnimalCard {
    pub fn new(image: &str, name: &str) -> Self {
        Self {
            image: image.to_string(),
            name: name.to_string(),
            clue: String::new(),
        }
    }

    pub fn with_clue(mut self, clue: &str) -> Self {
        self.clue = clue.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamingImage {
    pub id: u32,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptPair {
    pub first: String,
    pub second: String,
}

/// Per-step payload shown to the patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestContent {
    AnimalGuess {
        title: String,
        instruction: String,
    },
    Naming {
        title: String,
        instruction: String,
        images: Vec<NamingImage>,
    },
    Repetition {
        title: String,
        instruction: String,
        sentences: Vec<String>,
    },
    Fluency {
        title: String,
        instruction: String,
        time_limit_secs: u32,
    },
    Memory {
        title: String,
        instruction: String,
        words: Vec<String>,
    },
    Abstraction {
        title: String,
        instruction: String,
        pairs: Vec<ConceptPair>,
    },
}

impl TestContent {
    pub fn title(&self) -> &str {
        match self {
            TestContent::AnimalGuess { title, .. }
            | TestContent::Naming { title, .. }
            | TestContent::Repetition { title, .. }
            | TestContent::Fluency { title, .. }
            | TestContent::Memory { title, .. }
            | TestContent::Abstraction { title, .. } => title,
        }
    }

    pub fn instruction(&self) -> &str {
        match self {
            TestContent::AnimalGuess { instruction, .. }
            | TestContent::Naming { instruction, .. }
            | TestContent::Repetition { instruction, .. }
            | TestContent::Fluency { instruction, .. }
            | TestContent::Memory { instruction, .. }
            | TestContent::Abstraction { instruction, .. } => instruction,
        }
    }

    /// How many typed entries the step expects, if bounded
    pub fn expected_entries(&self) -> Option<usize> {
        match self {
            TestContent::AnimalGuess { .. } => Some(QUIZ_ITEMS),
            TestContent::Naming { images, .. } => Some(images.len()),
            TestContent::Repetition { sentences, .. } => Some(sentences.len()),
            TestContent::Memory { words, .. } => Some(words.len()),
            TestContent::Abstraction { pairs, .. } => Some(pairs.len()),
            TestContent::Fluency { .. } => None,
        }
    }
}

/// On-disk shape of a catalog file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub steps: Vec<TestStep>,
    pub contents: BTreeMap<StepId, TestContent>,
    #[serde(default)]
    pub content_optional: Vec<StepId>,
    #[serde(default)]
    pub animals: Vec<AnimalCard>,
}

/// Immutable definition of the screening: ordered steps, their content and
/// the animal pool the quiz draws from.
#[derive(Debug, Clone)]
pub struct Catalog {
    steps: Vec<TestStep>,
    contents: BTreeMap<StepId, TestContent>,
    animals: Vec<AnimalCard>,
}

impl Catalog {
    pub fn new(
        steps: Vec<TestStep>,
        contents: BTreeMap<StepId, TestContent>,
        content_optional: &[StepId],
        animals: Vec<AnimalCard>,
    ) -> Result<Self, CatalogError> {
        if steps.is_empty() {
            return Err(CatalogError::NoSteps);
        }

        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.id.clone()) {
                return Err(CatalogError::DuplicateStep(step.id.clone()));
            }
            if !contents.contains_key(&step.id) && !content_optional.contains(&step.id) {
                return Err(CatalogError::MissingContent(step.id.clone()));
            }
        }

        if steps.iter().any(|s| s.id.is_animal_guess()) && animals.len() < QUIZ_ITEMS {
            return Err(CatalogError::TooFewAnimals {
                found: animals.len(),
                needed: QUIZ_ITEMS,
            });
        }

        Ok(Self {
            steps,
            contents,
            animals,
        })
    }

    pub fn from_file(file: CatalogFile) -> Result<Self, CatalogError> {
        Self::new(file.steps, file.contents, &file.content_optional, file.animals)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let bytes = fs::read(path.as_ref())?;
        let mut file: CatalogFile = serde_json::from_slice(&bytes)?;
        if file.animals.is_empty() {
            file.animals = standard_animals();
        }
        Self::from_file(file)
    }

    /// Built-in screening used when no catalog file is configured
    pub fn standard() -> Self {
        let steps = vec![
            TestStep::new(
                ANIMAL_GUESS,
                "Animal Guess Test",
                "Guess the animal shown in the picture",
            ),
            TestStep::new(REPETITION, "Sentence Repetition", "Repeat phrases"),
            TestStep::new(FLUENCY, "Verbal Fluency", "Word generation"),
            TestStep::new(MEMORY, "Memory Recall", "Remember words"),
            TestStep::new(ABSTRACTION, "Abstraction", "Abstract thinking"),
        ];

        Self {
            steps,
            contents: standard_contents(),
            animals: standard_animals(),
        }
    }

    pub fn steps(&self) -> &[TestStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&TestStep> {
        self.steps.get(index)
    }

    pub fn content(&self, id: &StepId) -> Option<&TestContent> {
        self.contents.get(id)
    }

    pub fn animals(&self) -> &[AnimalCard] {
        &self.animals
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_contents() -> BTreeMap<StepId, TestContent> {
    let mut contents = BTreeMap::new();

    contents.insert(
        StepId::new(ANIMAL_GUESS),
        TestContent::AnimalGuess {
            title: "Animal Guess Test".into(),
            instruction: "Look at each animal picture and type your guess. You will get 1 mark for each correct answer.".into(),
        },
    );
    contents.insert(
        StepId::new(NAMING),
        TestContent::Naming {
            title: "Object Naming Test".into(),
            instruction: "Look at the images below and say the name of each object. You can use the voice button to record your response or type your answer.".into(),
            images: vec![
                NamingImage { id: 1, name: "Apple".into(), description: "A red fruit".into() },
                NamingImage { id: 2, name: "Clock".into(), description: "Shows time with hands".into() },
                NamingImage { id: 3, name: "Bicycle".into(), description: "Two-wheeled vehicle".into() },
            ],
        },
    );
    contents.insert(
        StepId::new(REPETITION),
        TestContent::Repetition {
            title: "Sentence Repetition".into(),
            instruction: "Listen carefully to the sentence and repeat it exactly as you heard it. Use the voice button to record your response or type it.".into(),
            sentences: vec![
                "The quick brown fox jumps over the lazy dog.".into(),
                "She sells seashells by the seashore.".into(),
                "The early bird catches the worm.".into(),
            ],
        },
    );
    contents.insert(
        StepId::new(FLUENCY),
        TestContent::Fluency {
            title: "Verbal Fluency Test".into(),
            instruction: "You have 60 seconds to name as many animals as you can. The timer starts as soon as you begin typing. Separate animals with commas and try to name different ones.".into(),
            time_limit_secs: 60,
        },
    );
    contents.insert(
        StepId::new(MEMORY),
        TestContent::Memory {
            title: "Memory Recall Test".into(),
            instruction: "Try to remember these three words. You will be asked to recall them later in the test.".into(),
            words: vec!["APPLE".into(), "SUNSHINE".into(), "DOORWAY".into()],
        },
    );
    contents.insert(
        StepId::new(ABSTRACTION),
        TestContent::Abstraction {
            title: "Abstraction Test".into(),
            instruction: "Tell me how these two things are alike or what they have in common.".into(),
            pairs: vec![
                ConceptPair { first: "Orange".into(), second: "Banana".into() },
                ConceptPair { first: "Train".into(), second: "Bicycle".into() },
            ],
        },
    );

    contents
}

pub fn standard_animals() -> Vec<AnimalCard> {
    [
        ("Lion", "jpg", "A big tawny cat with a shaggy mane around its head"),
        ("Tiger", "jpg", "A large orange cat with black stripes"),
        ("Elephant", "jpg", "A huge grey animal with a long trunk and tusks"),
        ("Giraffe", "jpg", "A very tall animal with a long neck and brown patches"),
        ("Zebra", "jpg", "A horse-like animal with black and white stripes"),
        ("Leopard", "png", "A spotted wild cat resting on a tree branch"),
        ("Rhinoceros", "jpg", "A heavy grey animal with a horn on its nose"),
        ("Hippopotamus", "jpg", "A bulky animal with a wide mouth, half under water"),
        ("Panda", "jpg", "A black and white bear eating bamboo"),
        ("Kangaroo", "png", "An animal that hops on big back legs and has a pouch"),
        ("Bear", "jpg", "A large brown furry animal standing on four paws"),
        ("Fox", "jpg", "A small reddish animal with a bushy white-tipped tail"),
        ("Deer", "jpg", "A slender brown animal with antlers in a forest"),
        ("Camel", "jpg", "A desert animal with a hump on its back"),
        ("Horse", "jpg", "A farm animal with a mane and hooves that people ride"),
        ("Monkey", "jpg", "A playful animal with a long tail swinging in a tree"),
        ("Donkey", "jpg", "A grey farm animal with long ears that carries loads"),
        ("Cow", "jpg", "A farm animal with black and white patches that gives milk"),
        ("Goat", "jpg", "A farm animal with small horns and a beard under its chin"),
        ("Sheep", "jpg", "A farm animal covered in thick white wool"),
        ("Hen", "jpg", "A farm bird that lays eggs"),
        ("Duck", "jpg", "A bird with a flat orange bill swimming on a pond"),
    ]
    .iter()
    .map(|(name, ext, clue)| {
        AnimalCard::new(&format!("assets/animals/{name}.{ext}"), name).with_clue(clue)
    })
    .collect()
}
