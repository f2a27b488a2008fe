pub mod assignment_candidate;
pub mod group;
pub mod mediafile;
pub mod meeting;
pub mod motion_state;
pub mod motion_workflow;
pub mod projector;
pub mod projector_countdown;
pub mod user;
