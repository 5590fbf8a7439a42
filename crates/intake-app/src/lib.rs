// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod badge;
pub mod detector;
pub mod editor;
pub mod forms;
pub mod graphemes;
pub mod ids;
pub mod issue;
pub mod mention;
pub mod model;
pub mod picker;
pub mod state;
pub mod submission;
pub mod template;
pub mod token;

pub use detector::{FieldRect, Point};
pub use editor::{EditOutcome, MentionText};
pub use forms::*;
pub use ids::*;
pub use issue::{IssueDraft, build_issue_draft, render_response};
pub use mention::{Mention, MentionError, MentionSet};
pub use model::*;
pub use picker::{Candidate, CandidateKind, ExternalKind, Picker, PickerOptions};
pub use state::*;
pub use submission::{Submission, SubmissionValue, UploadedFile, validate_submission};
