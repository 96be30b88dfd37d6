pub mod annotations;
pub mod auth;
pub mod certificates;
pub mod collaborators;
pub mod documents;
pub mod mentions;
pub mod plans;
pub mod tags;
pub mod timeline;
pub mod users;
