mod port;
mod supervisor;
