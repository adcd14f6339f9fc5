pub mod outbox_repo;

pub use outbox_repo::OutboxRepo;
