pub mod vote_log;
