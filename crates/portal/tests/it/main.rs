mod collection;
mod session;

fn main() {}
