//! User confirmation.

/// Asks the user a yes/no question.
pub trait Prompt {
    /// Show `message` and return whether the user confirmed.
    fn confirm(&self, message: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Prompt for F {
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MockPrompt;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::Prompt;

    /// Prompt with a fixed answer that records every question.
    #[derive(Clone)]
    pub struct MockPrompt {
        answer: Rc<Cell<bool>>,
        asked: Rc<RefCell<Vec<String>>>,
    }

    impl MockPrompt {
        /// Prompt that always answers `answer`.
        #[must_use]
        pub fn answering(answer: bool) -> Self {
            Self {
                answer: Rc::new(Cell::new(answer)),
                asked: Rc::default(),
            }
        }

        /// Change the answer for subsequent questions.
        pub fn set_answer(&self, answer: bool) {
            self.answer.set(answer);
        }

        /// Questions asked so far.
        #[must_use]
        pub fn asked(&self) -> Vec<String> {
            self.asked.borrow().clone()
        }
    }

    impl Prompt for MockPrompt {
        fn confirm(&self, message: &str) -> bool {
            self.asked.borrow_mut().push(message.to_owned());
            self.answer.get()
        }
    }
}
