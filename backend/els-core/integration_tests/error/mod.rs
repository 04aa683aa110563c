mod establish;
mod launch;
