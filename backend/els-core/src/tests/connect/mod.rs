mod establish;
mod policy;
