pub mod annotations;
pub mod due;
pub mod evaluate;
pub mod feedback;
pub mod highlight;
pub mod key;
pub mod review;
pub mod rubric;
