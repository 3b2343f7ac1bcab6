//! Client and serve loop talking to each other over in-memory pipes.

mod round_trip;
