pub mod city;
pub mod plan;
