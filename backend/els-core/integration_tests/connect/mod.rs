mod channel;
mod establish;
